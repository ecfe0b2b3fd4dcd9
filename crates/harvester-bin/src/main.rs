#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use harvester::config::AppConfig;
use harvester::io::{WarehouseClient, WarehouseConfig};
use harvester::service::{apply_schema, PostgresMetadataStore};
use harvester::service::puller::run_loop;
use harvester::CancellationToken;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Resolves when either SIGINT or SIGTERM arrives. SIGTERM has no
/// standard-library equivalent; `tokio::signal::unix` only builds on unix,
/// so non-unix targets fall back to `ctrl_c` alone.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[derive(Parser)]
#[command(version, about = "Metadata-driven search-to-warehouse ingestion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the puller's loop entry point. No flags: all configuration is
    /// read from the environment and the `puller_config` row.
    Puller,
    /// Schema migrator commands.
    Migrate {
        #[command(subcommand)]
        command: MigrateCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Apply the warehouse schema for every enabled project and parsing
    /// table. Exits non-zero if any DDL unit fails.
    Apply {
        /// Collect a per-unit outcome list and print it as JSON instead of
        /// aborting on the first failure.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Puller => {
            let store =
                PostgresMetadataStore::connect(&config.postgres_dsn, config.pg_acquire_timeout(), config.pg_max_connections)
                    .await?;
            let cancel = CancellationToken::new();
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                wait_for_shutdown().await;
                tracing::info!("shutdown signal received");
                shutdown.cancel();
            });
            run_loop(store, config, cancel).await;
            Ok(())
        }
        Commands::Migrate {
            command: MigrateCommands::Apply { json },
        } => {
            let store =
                PostgresMetadataStore::connect(&config.postgres_dsn, config.pg_acquire_timeout(), config.pg_max_connections)
                    .await?;
            let warehouse = WarehouseClient::new(WarehouseConfig {
                base_url: config.clickhouse_http_url.clone(),
                timeout: config.warehouse_timeout(),
                retry_policy: harvester::io::RetryPolicy::new(config.max_retries, std::time::Duration::from_secs_f64(config.backoff_base_seconds)),
            })?;

            let outcome = apply_schema(&store, &warehouse, json).await?;
            match outcome {
                Some(results) => {
                    let failed = results.iter().any(|r| r.status == "error");
                    println!("{}", serde_json::to_string_pretty(&results)?);
                    if failed {
                        anyhow::bail!("one or more schema units failed");
                    }
                }
                None => println!("schema applied"),
            }
            Ok(())
        }
    }
}

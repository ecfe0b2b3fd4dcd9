use std::time::Duration;

use harvester_io::{AuthMode, RetryPolicy, UpstreamClient, UpstreamConfig, WarehouseClient, WarehouseConfig};

use crate::config::AppConfig;
use crate::error::HarvesterError;
use crate::service::entities::{Source, SourceAuthType};
use crate::service::implementations::postgres::{log_and_continue, PostgresMetadataStore};
use crate::service::migrator::{ensure_default_bronze_columns, ensure_project_storage};
use crate::service::puller::backfill::process_backfill;
use crate::service::puller::config::EffectiveConfig;
use crate::service::puller::incremental::process_incremental;
use crate::utils::{resolve_secret, SecretLocation};
use crate::CancellationToken;

fn secret_location(source: &Source) -> SecretLocation {
    if let Some(path) = &source.secret_ref {
        SecretLocation::FileRef(path.into())
    } else if let Some(bytes) = &source.secret_enc {
        SecretLocation::Ciphertext(bytes.clone())
    } else {
        SecretLocation::None
    }
}

/// Source processed with anonymous headers when the secret cannot be
/// resolved; upstream returning 401 becomes the ingestion error (§4.4.5).
fn build_auth_mode(source: &Source, secret: Option<String>) -> AuthMode {
    match source.auth_type {
        SourceAuthType::Basic => match (source.username.as_ref(), secret) {
            (Some(username), Some(password)) if !username.is_empty() => AuthMode::Basic {
                username: username.clone(),
                password,
            },
            _ => AuthMode::None,
        },
        SourceAuthType::ApiKey => secret.map_or(AuthMode::None, AuthMode::ApiKey),
        SourceAuthType::Bearer => secret.map_or(AuthMode::None, AuthMode::Bearer),
        SourceAuthType::None => AuthMode::None,
    }
}

fn build_upstream_client(
    source: &Source,
    app: &AppConfig,
    config: &EffectiveConfig,
) -> Result<UpstreamClient, HarvesterError> {
    let secret = resolve_secret(&secret_location(source), app.secret_key.as_deref());
    let auth = build_auth_mode(source, secret);
    let retry_policy = RetryPolicy::new(
        config.max_retries,
        Duration::from_secs_f64(config.backoff_base_seconds),
    );
    let client = UpstreamClient::new(UpstreamConfig {
        base_url: source.base_url.clone(),
        auth,
        timeout: Duration::from_secs(config.opensearch_timeout_seconds),
        verify_tls: config.opensearch_verify_ssl,
        retry_policy,
    })?;
    Ok(client)
}

async fn process_source(
    store: &PostgresMetadataStore,
    warehouse: &WarehouseClient,
    app: &AppConfig,
    config: &EffectiveConfig,
    source: &Source,
) -> Result<(), HarvesterError> {
    ensure_project_storage(warehouse, &source.project_id).await?;
    let upstream = build_upstream_client(source, app, config)?;

    match store.fetch_backfill_job(source.source_id).await {
        Ok(Some(job)) => {
            tracing::info!(job_id = job.job_id, source_id = source.source_id, "processing backfill job");
            if let Err(e) =
                process_backfill(store, warehouse, &upstream, source, &job, config).await
            {
                tracing::error!(job_id = job.job_id, error = %e, "backfill job failed");
                log_and_continue(
                    "set_backfill_status(failed)",
                    store
                        .set_backfill_status(job.job_id, "failed", Some(&e.to_string()))
                        .await,
                );
            }
            Ok(())
        }
        Ok(None) => process_incremental(store, warehouse, &upstream, source, config).await,
        Err(e) => {
            tracing::warn!(error = %e, "unable to read backfill job; falling back to incremental");
            process_incremental(store, warehouse, &upstream, source, config).await
        }
    }
}

/// One full cycle over all enabled sources (§4.4). A failure in one
/// source does not stop the others.
pub async fn run_once(
    store: &PostgresMetadataStore,
    app: &AppConfig,
    config: &mut EffectiveConfig,
) -> Result<(), HarvesterError> {
    if let Some(row) =
        log_and_continue("fetch_puller_config", store.fetch_puller_config().await).flatten()
    {
        config.apply_row(&row);
    }

    let warehouse = WarehouseClient::new(WarehouseConfig {
        base_url: app.clickhouse_http_url.clone(),
        timeout: Duration::from_secs(config.clickhouse_timeout_seconds),
        retry_policy: RetryPolicy::new(
            config.max_retries,
            Duration::from_secs_f64(config.backoff_base_seconds),
        ),
    })?;

    log_and_continue(
        "upsert_worker_heartbeat(running)",
        store
            .upsert_worker_heartbeat(&app.worker_id, "opensearch_puller", "running", &config.snapshot())
            .await,
    );

    let sources = store.fetch_enabled_sources().await?;
    if sources.is_empty() {
        tracing::info!("no enabled sources found");
    } else {
        ensure_default_bronze_columns(&warehouse).await?;
    }

    for source in &sources {
        if let Err(e) = process_source(store, &warehouse, app, config, source).await {
            tracing::error!(source_id = source.source_id, error = %e, "source cycle failed");
        }
    }

    log_and_continue(
        "upsert_worker_heartbeat(idle)",
        store
            .upsert_worker_heartbeat(&app.worker_id, "opensearch_puller", "idle", &config.snapshot())
            .await,
    );
    Ok(())
}

/// The puller's loop entry point (§6: no CLI flags). Runs cycles until
/// `cancel` fires, sleeping `poll_interval_seconds` between them.
pub async fn run_loop(store: PostgresMetadataStore, app: AppConfig, cancel: CancellationToken) {
    tracing::info!("puller starting");
    let mut config = EffectiveConfig::from(&app);
    while !cancel.is_cancelled() {
        if let Err(e) = run_once(&store, &app, &mut config).await {
            tracing::error!(error = %e, "puller cycle failed");
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(config.poll_interval_seconds)) => {}
            () = cancel.cancelled() => break,
        }
    }
    tracing::info!("puller stopping");
}

mod backfill_jobs;
mod bronze_tables;
mod dbutils;
mod field_registry;
mod heartbeats;
mod ingestion_state;
mod projects;
mod puller_config;
mod sources;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::HarvesterError;

pub use dbutils::log_and_continue;

/// Gateway over the `metadata` schema (§6): autocommit, one connection per
/// operation, no application-level locking (§5).
#[derive(Debug, Clone)]
pub struct PostgresMetadataStore {
    pub(crate) pool: PgPool,
}

impl PostgresMetadataStore {
    /// # Errors
    /// Returns [`HarvesterError::Metadata`] if the pool cannot be
    /// established within `acquire_timeout`.
    pub async fn connect(
        dsn: &str,
        acquire_timeout: Duration,
        max_connections: u32,
    ) -> Result<Self, HarvesterError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }
}

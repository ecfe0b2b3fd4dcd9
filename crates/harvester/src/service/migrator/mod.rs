//! Schema migrator (§4.5): projects ClickHouse DDL for parsed bronze
//! columns and field-registry computed columns from Postgres metadata.
//! Grounded in `schema_migrator/migrator.py`'s module-level functions; the
//! JSON-path compiler and dataset predicate live in
//! [`crate::utils::json_path`] since the puller's hit mapping has no use
//! for them but the migrator and a future backfill-reparse would share them.

mod bronze;
mod field_registry;
mod result;

pub use bronze::{ensure_default_bronze_columns, ensure_project_storage};
pub use result::MigrationResult;

use harvester_io::WarehouseClient;

use crate::error::HarvesterError;
use crate::service::implementations::postgres::PostgresMetadataStore;

/// Runs the full schema migration (§4.5): default bronze columns, each
/// enabled project's storage, bronze parsing tables, then field-registry
/// computed columns. With `collect_results`, a unit's failure is recorded
/// and does not stop the rest, matching `migrate apply --json` (§6); with
/// it off, the first failure aborts the run.
///
/// # Errors
/// Returns [`HarvesterError`] if metadata cannot be read, or (with
/// `collect_results` false) if any DDL unit fails.
pub async fn apply_schema(
    store: &PostgresMetadataStore,
    warehouse: &WarehouseClient,
    collect_results: bool,
) -> Result<Option<Vec<MigrationResult>>, HarvesterError> {
    let projects = store.fetch_enabled_projects().await?;
    let field_rows = store.fetch_field_registry().await?;
    let bronze_tables = match store.fetch_bronze_event_tables().await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, "bronze parsing tables not available");
            Vec::new()
        }
    };
    let bronze_fields = match store.fetch_bronze_event_fields().await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, "bronze parsing fields not available");
            Vec::new()
        }
    };

    let project_ids: Vec<String> = projects.into_iter().map(|p| p.project_id).collect();
    tracing::info!(count = project_ids.len(), "applying schema for enabled projects");

    bronze::ensure_default_bronze_columns(warehouse).await?;
    for project_id in &project_ids {
        bronze::ensure_project_storage(warehouse, project_id).await?;
    }

    let mut results = bronze::apply_bronze_event_tables(
        warehouse,
        &bronze_tables,
        &bronze_fields,
        &project_ids,
        collect_results,
    )
    .await?;
    let field_results =
        field_registry::apply_field_registry(warehouse, &field_rows, &project_ids, collect_results).await?;

    tracing::info!("schema migration complete");
    if !collect_results {
        return Ok(None);
    }
    results.extend(field_results);
    Ok(Some(results))
}

use std::collections::HashMap;

use harvester_io::WarehouseClient;

use crate::error::HarvesterError;
use crate::service::entities::{BronzeEventField, BronzeEventTable};
use crate::service::migrator::result::MigrationResult;
use crate::utils::identifier::{quote_identifier, require_identifier};
use crate::utils::json_path::{build_column_expr, dataset_filter};

const DEFAULT_BRONZE_TABLES: [&str; 3] = ["suricata_events_raw", "wazuh_events_raw", "zeek_events_raw"];

/// Adds the `raw`/`extras` landing columns to whichever of the three
/// pre-existing bronze tables are present (§4.5 step 2). A missing table
/// is skipped, not an error — most deployments only have some of them.
pub async fn ensure_default_bronze_columns(warehouse: &WarehouseClient) -> Result<(), HarvesterError> {
    for table in DEFAULT_BRONZE_TABLES {
        if !warehouse.table_exists("bronze", table).await? {
            tracing::info!(table, "skipping default bronze table, not found");
            continue;
        }
        warehouse
            .execute(&format!(
                "ALTER TABLE bronze.{table} \
                 ADD COLUMN IF NOT EXISTS raw String, \
                 ADD COLUMN IF NOT EXISTS extras Map(String, String) DEFAULT map()"
            ))
            .await?;
    }
    Ok(())
}

/// Creates `<project>_bronze`/`<project>_gold` and the raw landing table
/// (§4.5 step 3). Shared with the puller cycle, which also calls this
/// before writing to a project for the first time (§4.4 step 3a).
pub async fn ensure_project_storage(
    warehouse: &WarehouseClient,
    project_id: &str,
) -> Result<(), HarvesterError> {
    require_identifier(project_id)?;
    let bronze_db = quote_identifier(&format!("{project_id}_bronze"))?;
    let gold_db = quote_identifier(&format!("{project_id}_gold"))?;
    warehouse
        .execute(&format!("CREATE DATABASE IF NOT EXISTS {bronze_db}"))
        .await?;
    warehouse
        .execute(&format!("CREATE DATABASE IF NOT EXISTS {gold_db}"))
        .await?;
    warehouse
        .execute(&format!(
            "CREATE TABLE IF NOT EXISTS {bronze_db}.`os_events_raw` ( \
               event_id String, event_ts DateTime64(3), index_name String, source_id String, \
               raw String, ingested_at DateTime64(3), extras Map(String, String) DEFAULT map() \
             ) ENGINE = MergeTree PARTITION BY toDate(event_ts) \
               ORDER BY (source_id, toDate(event_ts), event_ts, event_id)"
        ))
        .await?;
    Ok(())
}

/// A row's explicit `project_id` restricts it to that one project (and is
/// skipped if that project is not enabled); an absent `project_id` targets
/// every enabled project (§4.5 step 4/5).
pub(super) fn resolve_target_projects(
    row_project_id: Option<&str>,
    unit_id: i64,
    project_ids: &[String],
) -> Vec<String> {
    match row_project_id {
        Some(pid) if !pid.is_empty() => {
            if project_ids.iter().any(|p| p == pid) {
                vec![pid.to_string()]
            } else {
                tracing::warn!(unit_id, project_id = pid, "skipping unit: project not enabled");
                Vec::new()
            }
        }
        _ => project_ids.to_vec(),
    }
}

async fn apply_one_bronze_table(
    warehouse: &WarehouseClient,
    project_id: &str,
    table: &BronzeEventTable,
    columns: &[&BronzeEventField],
    dataset: &str,
) -> Result<String, HarvesterError> {
    require_identifier(project_id)?;
    require_identifier(&table.table_name)?;
    let bronze_db = quote_identifier(&format!("{project_id}_bronze"))?;
    let qualified_table = format!("{bronze_db}.{}", quote_identifier(&table.table_name)?);

    let has_event_ts = columns.iter().any(|c| c.column_name == "event_ts");
    let has_event_id = columns.iter().any(|c| c.column_name == "event_id");
    if !has_event_ts {
        return Err(HarvesterError::Other(
            "event_ts column is required for bronze tables".to_string(),
        ));
    }

    let mut col_defs = Vec::with_capacity(columns.len());
    for col in columns {
        col_defs.push(format!(
            "{} {}",
            quote_identifier(&col.column_name)?,
            col.column_type
        ));
    }
    let order_by = if has_event_id { "event_ts, event_id" } else { "event_ts" };
    warehouse
        .execute(&format!(
            "CREATE TABLE IF NOT EXISTS {qualified_table} ({}) \
             ENGINE = MergeTree PARTITION BY toDate(event_ts) ORDER BY ({order_by})",
            col_defs.join(", ")
        ))
        .await?;

    for col in columns {
        warehouse
            .execute(&format!(
                "ALTER TABLE {qualified_table} ADD COLUMN IF NOT EXISTS {} {}",
                quote_identifier(&col.column_name)?,
                col.column_type
            ))
            .await?;
    }

    let mut select_exprs = Vec::with_capacity(columns.len());
    for col in columns {
        let expr = build_column_expr(&col.column_type, col.json_path.as_deref().unwrap_or(""))?;
        select_exprs.push(format!("{expr} AS {}", quote_identifier(&col.column_name)?));
    }
    let source_table = format!("{bronze_db}.`os_events_raw`");
    let mv_table = format!(
        "{bronze_db}.{}",
        quote_identifier(&format!("{}_mv", table.table_name))?
    );
    warehouse.execute(&format!("DROP TABLE IF EXISTS {mv_table}")).await?;
    warehouse
        .execute(&format!(
            "CREATE MATERIALIZED VIEW {mv_table} TO {qualified_table} AS SELECT {} FROM {source_table} WHERE {}",
            select_exprs.join(", "),
            dataset_filter(dataset)
        ))
        .await?;
    Ok(format!("{project_id}_bronze.{}", table.table_name))
}

/// Materializes each configured bronze parsing table into every project
/// database it targets, plus the continuous view projecting raw JSON into
/// the typed columns (§4.5 step 4, §4.5.1, §4.5.2). With `collect_results`
/// off, the first failing unit aborts the run and propagates its error.
pub async fn apply_bronze_event_tables(
    warehouse: &WarehouseClient,
    tables: &[BronzeEventTable],
    fields: &[BronzeEventField],
    project_ids: &[String],
    collect_results: bool,
) -> Result<Vec<MigrationResult>, HarvesterError> {
    let mut fields_by_table: HashMap<i64, Vec<&BronzeEventField>> = HashMap::new();
    for field in fields {
        fields_by_table.entry(field.table_id).or_default().push(field);
    }

    let mut results = Vec::new();
    for table in tables {
        let mut columns = fields_by_table
            .get(&table.table_id)
            .cloned()
            .unwrap_or_default();
        let unit = format!("bronze_event_table:{}", table.table_id);
        if columns.is_empty() {
            if collect_results {
                results.push(MigrationResult::skipped(unit, "no columns configured"));
            }
            continue;
        }
        columns.sort_by(|a, b| (a.ordinal, &a.column_name).cmp(&(b.ordinal, &b.column_name)));

        let dataset = table.dataset.clone().unwrap_or_default();
        for project_id in resolve_target_projects(table.project_id.as_deref(), table.table_id, project_ids) {
            match apply_one_bronze_table(warehouse, &project_id, table, &columns, &dataset).await {
                Ok(target) => {
                    if collect_results {
                        results.push(MigrationResult::applied(unit.clone(), target));
                    }
                }
                Err(e) => {
                    let target = format!("{project_id}_bronze.{}", table.table_name);
                    if collect_results {
                        results.push(MigrationResult::error(unit.clone(), target, e.to_string()));
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }
    Ok(results)
}

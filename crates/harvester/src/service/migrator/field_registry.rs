use harvester_io::WarehouseClient;

use crate::error::HarvesterError;
use crate::service::entities::FieldRegistryRow;
use crate::service::migrator::bronze::resolve_target_projects;
use crate::service::migrator::result::MigrationResult;
use crate::utils::identifier::{quote_identifier, require_identifier};

fn resolve_target_table(db_name: &str, table_name: &str) -> Result<String, HarvesterError> {
    if let Some((db_part, table_part)) = table_name.split_once('.') {
        Ok(format!(
            "{}.{}",
            quote_identifier(db_part)?,
            quote_identifier(table_part)?
        ))
    } else {
        Ok(format!(
            "{}.{}",
            quote_identifier(db_name)?,
            quote_identifier(table_name)?
        ))
    }
}

async fn apply_one_field(
    warehouse: &WarehouseClient,
    project_id: &str,
    db_suffix: &str,
    row: &FieldRegistryRow,
) -> Result<String, HarvesterError> {
    require_identifier(project_id)?;
    if let Some((db_part, table_part)) = row.table_name.split_once('.') {
        require_identifier(db_part)?;
        require_identifier(table_part)?;
    } else {
        require_identifier(&row.table_name)?;
    }
    require_identifier(&row.column_name)?;

    let target_db = format!("{project_id}{db_suffix}");
    let table = resolve_target_table(&target_db, &row.table_name)?;
    let column = quote_identifier(&row.column_name)?;
    let column_type = &row.column_type;

    let statement = if let Some(expr) = row.expression_sql.as_deref().filter(|s| !s.is_empty()) {
        let mode = if row.mode.trim().eq_ignore_ascii_case("materialized") {
            "MATERIALIZED"
        } else {
            "ALIAS"
        };
        format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {column} {column_type} {mode} {expr}")
    } else {
        format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {column} {column_type}")
    };

    tracing::info!(field_id = row.field_id, table = %table, "applying field");
    warehouse.execute(&statement).await?;
    Ok(table)
}

/// Applies each enabled `field_registry` row as an `ALTER TABLE ... ADD
/// COLUMN` against the resolved bronze/gold database (§4.5 step 5). A row
/// naming an unknown `layer`, or an unsafe identifier, is recorded and
/// skipped rather than aborting the run.
pub async fn apply_field_registry(
    warehouse: &WarehouseClient,
    rows: &[FieldRegistryRow],
    project_ids: &[String],
    collect_results: bool,
) -> Result<Vec<MigrationResult>, HarvesterError> {
    let mut results = Vec::new();
    for row in rows {
        let unit = format!("field_registry:{}", row.field_id);
        let layer = row.layer.trim().to_lowercase();
        let db_suffix = match layer.as_str() {
            "bronze" => "_bronze",
            "gold_fact" | "gold_dim" | "gold" => "_gold",
            other => {
                tracing::warn!(field_id = row.field_id, layer = other, "skipping field: unknown layer");
                if collect_results {
                    results.push(MigrationResult::skipped(unit, format!("unknown layer {other}")));
                }
                continue;
            }
        };

        for project_id in resolve_target_projects(row.project_id.as_deref(), row.field_id, project_ids) {
            match apply_one_field(warehouse, &project_id, db_suffix, row).await {
                Ok(target) => {
                    if collect_results {
                        results.push(MigrationResult::applied(unit.clone(), target));
                    }
                }
                Err(e) => {
                    let target = format!("{project_id}{db_suffix}.{}", row.table_name);
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

use crate::service::entities::FieldRegistryRow;

use super::PostgresMetadataStore;

impl PostgresMetadataStore {
    pub async fn fetch_field_registry(&self) -> Result<Vec<FieldRegistryRow>, sqlx::Error> {
        sqlx::query_as::<_, FieldRegistryRow>(
            r#"
            SELECT field_id, project_id, dataset, layer, table_name, column_name,
                   column_type, expression_sql, mode, enabled
            FROM metadata.field_registry
            WHERE enabled = TRUE
            ORDER BY field_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

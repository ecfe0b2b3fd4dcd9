use crate::service::entities::{BronzeEventField, BronzeEventTable};

use super::PostgresMetadataStore;

impl PostgresMetadataStore {
    pub async fn fetch_bronze_event_tables(&self) -> Result<Vec<BronzeEventTable>, sqlx::Error> {
        sqlx::query_as::<_, BronzeEventTable>(
            r#"
            SELECT table_id, project_id, dataset, table_name, enabled
            FROM metadata.bronze_event_tables
            WHERE enabled = TRUE
            ORDER BY table_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn fetch_bronze_event_fields(&self) -> Result<Vec<BronzeEventField>, sqlx::Error> {
        sqlx::query_as::<_, BronzeEventField>(
            r#"
            SELECT field_id, table_id, column_name, column_type, json_path, ordinal, enabled
            FROM metadata.bronze_event_fields
            WHERE enabled = TRUE
            ORDER BY table_id, ordinal, column_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

use chrono::{DateTime, Utc};

use crate::service::entities::IngestionState;

use super::PostgresMetadataStore;

impl PostgresMetadataStore {
    pub async fn fetch_ingestion_state(
        &self,
        source_id: i32,
        index_name: &str,
    ) -> Result<Option<IngestionState>, sqlx::Error> {
        sqlx::query_as::<_, IngestionState>(
            r#"
            SELECT source_id, index_name, last_ts, last_sort_json, last_id, status, last_error
            FROM metadata.ingestion_state
            WHERE source_id = $1 AND index_name = $2
            "#,
        )
        .bind(source_id)
        .bind(index_name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Upserted after every successful batch of an incremental tail
    /// (§4.4.1). Checkpoints are monotonic within an index (§3 invariant e)
    /// — callers are responsible for only ever advancing `last_sort_json`.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_ingestion_state(
        &self,
        source_id: i32,
        index_name: &str,
        last_ts: DateTime<Utc>,
        last_sort_json: &serde_json::Value,
        last_id: Option<&str>,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO metadata.ingestion_state
              (source_id, index_name, last_ts, last_sort_json, last_id, status, last_error, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NULL, now())
            ON CONFLICT (source_id, index_name) DO UPDATE SET
              last_ts = EXCLUDED.last_ts,
              last_sort_json = EXCLUDED.last_sort_json,
              last_id = EXCLUDED.last_id,
              status = EXCLUDED.status,
              last_error = NULL,
              updated_at = now()
            "#,
        )
        .bind(source_id)
        .bind(index_name)
        .bind(last_ts)
        .bind(last_sort_json)
        .bind(last_id)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_ingestion_status(
        &self,
        source_id: i32,
        index_name: &str,
        status: &str,
        last_error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE metadata.ingestion_state
            SET status = $1, last_error = $2, updated_at = now()
            WHERE source_id = $3 AND index_name = $4
            "#,
        )
        .bind(status)
        .bind(last_error)
        .bind(source_id)
        .bind(index_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

use crate::service::entities::PullerConfigRow;

use super::PostgresMetadataStore;

impl PostgresMetadataStore {
    /// Most recently updated `puller_config` row, if any.
    pub async fn fetch_puller_config(&self) -> Result<Option<PullerConfigRow>, sqlx::Error> {
        sqlx::query_as::<_, PullerConfigRow>(
            r#"
            SELECT poll_interval_seconds,
                   overlap_minutes,
                   batch_size,
                   max_retries,
                   backoff_base_seconds,
                   rate_limit_seconds,
                   opensearch_timeout_seconds,
                   clickhouse_timeout_seconds,
                   opensearch_verify_ssl
            FROM metadata.opensearch_puller_config
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
    }
}

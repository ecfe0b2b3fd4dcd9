use crate::service::entities::Source;

use super::PostgresMetadataStore;

impl PostgresMetadataStore {
    /// Enabled sources whose project is also enabled, joined for the
    /// invariant in a single query rather than filtered in memory.
    pub async fn fetch_enabled_sources(&self) -> Result<Vec<Source>, sqlx::Error> {
        sqlx::query_as::<_, Source>(
            r#"
            SELECT s.source_id,
                   s.project_id,
                   s.base_url,
                   s.auth_type,
                   s.username,
                   s.secret_ref,
                   s.secret_enc,
                   s.index_pattern,
                   s.time_field,
                   s.query_filter_json,
                   s.enabled
            FROM metadata.opensearch_sources s
            JOIN metadata.projects p ON p.project_id = s.project_id
            WHERE s.enabled = TRUE AND p.enabled = TRUE
            ORDER BY s.source_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

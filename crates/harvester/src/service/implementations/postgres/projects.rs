use crate::service::entities::Project;

use super::PostgresMetadataStore;

impl PostgresMetadataStore {
    /// Enabled projects (§3 invariant a: a source is only in scope when
    /// its project is also enabled).
    pub async fn fetch_enabled_projects(&self) -> Result<Vec<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT project_id, timezone, retention_days, enabled
            FROM metadata.projects
            WHERE enabled = TRUE
            ORDER BY project_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

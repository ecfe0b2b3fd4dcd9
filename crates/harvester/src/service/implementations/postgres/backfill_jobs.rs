use chrono::{DateTime, Utc};

use crate::service::entities::BackfillJob;

use super::PostgresMetadataStore;

impl PostgresMetadataStore {
    /// The single `pending`/`running` job for a source, oldest first
    /// (§6: "`backfill_jobs` are ordered by `created_at` ascending when
    /// claiming").
    pub async fn fetch_backfill_job(
        &self,
        source_id: i32,
    ) -> Result<Option<BackfillJob>, sqlx::Error> {
        sqlx::query_as::<_, BackfillJob>(
            r#"
            SELECT job_id, source_id, start_ts, end_ts, throttle_seconds, status,
                   last_error, last_index_name, last_ts, last_sort_json, last_id
            FROM metadata.backfill_jobs
            WHERE source_id = $1 AND status IN ('pending', 'running')
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn fetch_backfill_job_by_id(
        &self,
        job_id: i64,
    ) -> Result<Option<BackfillJob>, sqlx::Error> {
        sqlx::query_as::<_, BackfillJob>(
            r#"
            SELECT job_id, source_id, start_ts, end_ts, throttle_seconds, status,
                   last_error, last_index_name, last_ts, last_sort_json, last_id
            FROM metadata.backfill_jobs
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Optimistic claim (§9 Design Note: "recommended extension", adopted
    /// here as the as-built behavior): only transitions a job that is
    /// still `pending`/`running` at the moment of the update, so two
    /// pullers racing the same source cannot both believe they hold it.
    pub async fn claim_backfill_job(&self, job_id: i64) -> Result<bool, sqlx::Error> {
        let claimed: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE metadata.backfill_jobs
            SET status = 'running', updated_at = now()
            WHERE job_id = $1 AND status IN ('pending', 'running')
            RETURNING job_id
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(claimed.is_some())
    }

    pub async fn set_backfill_status(
        &self,
        job_id: i64,
        status: &str,
        last_error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE metadata.backfill_jobs
            SET status = $1, last_error = $2, updated_at = now()
            WHERE job_id = $3
            "#,
        )
        .bind(status)
        .bind(last_error)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_backfill_checkpoint(
        &self,
        job_id: i64,
        index_name: Option<&str>,
        last_ts: Option<DateTime<Utc>>,
        last_sort_json: Option<&serde_json::Value>,
        last_id: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE metadata.backfill_jobs
            SET last_index_name = $1, last_ts = $2, last_sort_json = $3, last_id = $4, updated_at = now()
            WHERE job_id = $5
            "#,
        )
        .bind(index_name)
        .bind(last_ts)
        .bind(last_sort_json)
        .bind(last_id)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

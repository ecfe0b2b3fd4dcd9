use super::PostgresMetadataStore;

impl PostgresMetadataStore {
    /// Upserted on each cycle entry and exit (§3 `Worker heartbeat`).
    pub async fn upsert_worker_heartbeat(
        &self,
        worker_id: &str,
        worker_type: &str,
        status: &str,
        details: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO metadata.worker_heartbeats (worker_id, worker_type, last_seen, status, details)
            VALUES ($1, $2, now(), $3, $4)
            ON CONFLICT (worker_id) DO UPDATE SET
              last_seen = now(),
              status = EXCLUDED.status,
              details = EXCLUDED.details
            "#,
        )
        .bind(worker_id)
        .bind(worker_type)
        .bind(status)
        .bind(details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

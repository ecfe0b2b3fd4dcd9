use std::time::Duration;

use crate::{
    error::ClientError,
    retry::{retry, RetryPolicy},
};

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry_policy: RetryPolicy,
}

/// Thin REST wrapper over the analytics warehouse (§4.3). Every statement
/// is posted as the `query` query-string parameter against `/`; a body is
/// only attached for row inserts.
#[derive(Debug, Clone)]
pub struct WarehouseClient {
    base_url: String,
    client: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl WarehouseClient {
    /// # Errors
    /// Returns [`ClientError`] if the underlying `reqwest` client cannot
    /// be built.
    pub fn new(config: WarehouseConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retry_policy: config.retry_policy,
        })
    }

    /// Executes any DDL/DML statement with an empty body. Not retried: a
    /// DDL failure is a semantic outcome the schema migrator records or
    /// surfaces per-row, not a transport hiccup to paper over.
    pub async fn execute(&self, sql: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .post(format!("{}/", self.base_url))
            .query(&[("query", sql)])
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        self.read_body(response).await
    }

    /// `SELECT count() FROM system.tables WHERE database = '…' AND name =
    /// '…'` — database/table are SQL-literal escaped, not identifier-quoted,
    /// since they appear inside a string literal here, not as identifiers.
    pub async fn table_exists(&self, database: &str, table: &str) -> Result<bool, ClientError> {
        let query = format!(
            "SELECT count() FROM system.tables WHERE database = '{}' AND name = '{}' FORMAT TabSeparated",
            escape_literal(database),
            escape_literal(table),
        );
        let body = self.execute(&query).await?;
        Ok(body.trim().parse::<u64>().unwrap_or(0) > 0)
    }

    /// `INSERT INTO <db>.<table> FORMAT JSONEachRow` with one compact JSON
    /// document per line. Retried with the shared exponential backoff
    /// policy regardless of status code — inserts have a single failure
    /// category, `WAREHOUSE_TRANSIENT`, not a semantic/transient split.
    pub async fn insert_rows(
        &self,
        database: &str,
        table: &str,
        rows: &[serde_json::Value],
    ) -> Result<(), ClientError> {
        if rows.is_empty() {
            return Ok(());
        }
        let sql = format!("INSERT INTO {database}.{table} FORMAT JSONEachRow");
        let payload = rows
            .iter()
            .map(|row| serde_json::to_string(row).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");

        retry(self.retry_policy, || {
            let sql = sql.clone();
            let payload = payload.clone();
            async move {
                let response = self
                    .client
                    .post(format!("{}/", self.base_url))
                    .query(&[("query", sql.as_str())])
                    .body(payload)
                    .send()
                    .await
                    .map_err(ClientError::from_reqwest)?;
                self.read_insert_body(response).await.map(|_| ())
            }
        })
        .await
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<String, ClientError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(if status < 500 {
                ClientError::Semantic { status, body }
            } else {
                ClientError::Transient(format!("status {status}: {body}"))
            });
        }
        response
            .text()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Unlike `read_body`, a non-success status here is always transient:
    /// an insert has exactly one failure category (`WAREHOUSE_TRANSIENT`),
    /// retried with backoff regardless of status code, matching the
    /// source's `_retry_clickhouse` which retries any request exception.
    async fn read_insert_body(&self, response: reqwest::Response) -> Result<String, ClientError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Transient(format!("status {status}: {body}")));
        }
        response
            .text()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_literal_doubles_single_quotes() {
        assert_eq!(escape_literal("o'brien"), "o''brien");
    }

    #[test]
    fn insert_rows_sql_shape() {
        let sql = "INSERT INTO demo_bronze.os_events_raw FORMAT JSONEachRow";
        assert!(sql.starts_with("INSERT INTO "));
        assert!(sql.ends_with("FORMAT JSONEachRow"));
    }

    #[test]
    fn insert_rows_status_is_always_transient() {
        // unlike execute()'s read_body, a 4xx insert failure must still be
        // retryable, so it is never classified ClientError::Semantic.
        let err = ClientError::Transient("status 422: type mismatch".to_string());
        assert!(matches!(err, ClientError::Transient(_)));
    }
}

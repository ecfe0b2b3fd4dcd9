use std::{collections::BTreeSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::ClientError,
    retry::{retry, RetryPolicy},
};

/// How the upstream client authenticates itself (§4.2).
#[derive(Debug, Clone)]
pub enum AuthMode {
    None,
    Basic { username: String, password: String },
    ApiKey(String),
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub auth: AuthMode,
    pub timeout: Duration,
    pub verify_tls: bool,
    pub retry_policy: RetryPolicy,
}

/// Thin REST wrapper over the upstream search cluster. Retries transient
/// failures with exponential backoff; never retries a semantic 4xx.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    base_url: String,
    client: reqwest::Client,
    auth: AuthMode,
    retry_policy: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct PitRef<'a> {
    id: &'a str,
    keep_alive: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub size: u32,
    pub sort: serde_json::Value,
    pub track_total_hits: bool,
    pub query: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pit: Option<PitRef<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_after: Option<&'a [serde_json::Value]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_source")]
    pub source: serde_json::Value,
    #[serde(default)]
    pub sort: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct CatIndexRow {
    index: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PitResponse {
    id: Option<String>,
}

impl UpstreamClient {
    /// # Errors
    /// Returns [`ClientError`] if the TLS-verification setting cannot be
    /// applied to the underlying `reqwest` client.
    pub fn new(config: UpstreamConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            auth: config.auth,
            retry_policy: config.retry_policy,
        })
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthMode::None => builder,
            AuthMode::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            AuthMode::ApiKey(secret) => builder.header("Authorization", format!("ApiKey {secret}")),
            AuthMode::Bearer(secret) => builder.header("Authorization", format!("Bearer {secret}")),
        }
    }

    /// `GET /_cat/indices/<pattern>?format=json&h=index,status`. A 404 is
    /// treated as an empty result, not an error (§4.2).
    pub async fn list_indices(&self, pattern: &str) -> Result<BTreeSet<String>, ClientError> {
        let url = format!("{}/_cat/indices/{pattern}", self.base_url);
        let result = retry(self.retry_policy, || async {
            let response = self
                .apply_auth(self.client.get(&url))
                .query(&[("format", "json"), ("h", "index,status")])
                .send()
                .await
                .map_err(ClientError::from_reqwest)?;

            if response.status().as_u16() == 404 {
                return Ok(Vec::new());
            }
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
                .json::<Vec<CatIndexRow>>()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))
        })
        .await?;

        Ok(result
            .into_iter()
            .filter(|row| row.status.as_deref() != Some("close"))
            .filter_map(|row| row.index)
            .collect())
    }

    /// `POST /<index>/_pit?keep_alive=1m`.
    pub async fn open_pit(&self, index_name: &str) -> Result<String, ClientError> {
        let url = format!("{}/{index_name}/_pit", self.base_url);
        retry(self.retry_policy, || async {
            let response = self
                .apply_auth(self.client.post(&url))
                .query(&[("keep_alive", "1m")])
                .send()
                .await
                .map_err(ClientError::from_reqwest)?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(if status < 500 {
                    ClientError::Semantic { status, body }
                } else {
                    ClientError::Transient(format!("status {status}: {body}"))
                });
            }
            let parsed: PitResponse = response
                .json()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            parsed
                .id
                .ok_or_else(|| ClientError::Decode("PIT id missing from response".into()))
        })
        .await
    }

    /// `DELETE /_pit`. Best-effort: failures are logged, never raised.
    pub async fn close_pit(&self, pit_id: &str) {
        let url = format!("{}/_pit", self.base_url);
        let result = self
            .apply_auth(self.client.delete(&url))
            .json(&serde_json::json!({ "id": pit_id }))
            .send()
            .await;
        if let Err(err) = result {
            tracing::warn!(%err, "failed to close PIT");
        }
    }

    /// `POST /_search` (PIT body) or `POST /<index>/_search` (fallback).
    /// `index_name` is ignored when `request.pit` is set.
    pub async fn search(
        &self,
        request: &SearchRequest<'_>,
        index_name: Option<&str>,
    ) -> Result<Vec<SearchHit>, ClientError> {
        let path = match (request.pit.is_some(), index_name) {
            (true, _) | (false, None) => "/_search".to_string(),
            (false, Some(index)) => format!("/{index}/_search"),
        };
        let url = format!("{}{path}", self.base_url);
        let response: SearchResponse = retry(self.retry_policy, || async {
            let response = self
                .apply_auth(self.client.post(&url))
                .json(request)
                .send()
                .await
                .map_err(ClientError::from_reqwest)?;
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
                .json()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))
        })
        .await?;
        Ok(response.hits.hits)
    }
}

impl<'a> SearchRequest<'a> {
    #[must_use]
    pub fn with_pit(pit_id: &'a str) -> Option<PitRef<'a>> {
        Some(PitRef {
            id: pit_id,
            keep_alive: "1m",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cat_index_rows_exclude_closed_indices() {
        let rows: Vec<CatIndexRow> = serde_json::from_str(
            r#"[{"index":"a","status":"open"},{"index":"b","status":"close"}]"#,
        )
        .unwrap();
        let open: BTreeSet<String> = rows
            .into_iter()
            .filter(|r| r.status.as_deref() != Some("close"))
            .filter_map(|r| r.index)
            .collect();
        assert_eq!(open, BTreeSet::from(["a".to_string()]));
    }

    #[test]
    fn search_request_omits_search_after_when_absent() {
        let request = SearchRequest {
            size: 10,
            sort: serde_json::json!([{"@timestamp": "asc"}]),
            track_total_hits: false,
            query: serde_json::json!({"match_all": {}}),
            pit: None,
            search_after: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("search_after").is_none());
        assert!(value.get("pit").is_none());
    }
}

//! Typed metadata entities (§3). Modeled as tagged records with explicit
//! optional fields per §9 Design Note — no row is ever consumed as a loose
//! mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A source's stored auth kind — distinct from [`harvester_io::AuthMode`],
/// which additionally carries the resolved credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum SourceAuthType {
    None,
    Basic,
    ApiKey,
    Bearer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum IngestionStatus {
    Idle,
    Running,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum BackfillStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl BackfillStatus {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, BackfillStatus::Pending | BackfillStatus::Running)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub project_id: String,
    pub timezone: String,
    pub retention_days: i32,
    pub enabled: bool,
}

/// An `opensearch_sources` row. `secret_ref` and `secret_enc` are mutually
/// exclusive in effect (§3 invariant b); the resolver prefers `secret_ref`.
#[derive(Debug, Clone, FromRow)]
pub struct Source {
    pub source_id: i32,
    pub project_id: String,
    pub base_url: String,
    pub auth_type: SourceAuthType,
    pub username: Option<String>,
    pub secret_ref: Option<String>,
    pub secret_enc: Option<Vec<u8>>,
    pub index_pattern: String,
    pub time_field: String,
    pub query_filter_json: Option<serde_json::Value>,
    pub enabled: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct IngestionState {
    pub source_id: i32,
    pub index_name: String,
    pub last_ts: Option<DateTime<Utc>>,
    pub last_sort_json: Option<serde_json::Value>,
    pub last_id: Option<String>,
    pub status: IngestionStatus,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BackfillJob {
    pub job_id: i64,
    pub source_id: i32,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub throttle_seconds: Option<f64>,
    pub status: BackfillStatus,
    pub last_error: Option<String>,
    pub last_index_name: Option<String>,
    pub last_ts: Option<DateTime<Utc>>,
    pub last_sort_json: Option<serde_json::Value>,
    pub last_id: Option<String>,
}

/// Read at the start of each cycle (§4.4 step 1); fields below a per-field
/// minimum are ignored and the previous effective value is kept — see
/// [`crate::service::puller::EffectiveConfig::apply_row`].
#[derive(Debug, Clone, FromRow)]
pub struct PullerConfigRow {
    pub poll_interval_seconds: Option<i32>,
    pub overlap_minutes: Option<i32>,
    pub batch_size: Option<i32>,
    pub max_retries: Option<i32>,
    pub backoff_base_seconds: Option<f64>,
    pub rate_limit_seconds: Option<f64>,
    pub opensearch_timeout_seconds: Option<i32>,
    pub clickhouse_timeout_seconds: Option<i32>,
    pub opensearch_verify_ssl: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BronzeEventTable {
    pub table_id: i64,
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub table_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct BronzeEventField {
    pub field_id: i64,
    pub table_id: i64,
    pub column_name: String,
    pub column_type: String,
    pub json_path: Option<String>,
    pub ordinal: i32,
    pub enabled: bool,
}

/// A field-registry row's `layer` and `mode` are kept as plain strings,
/// not enums: the migrator must record and skip unknown layers (§4.5 step
/// 5) rather than fail to deserialize the row.
#[derive(Debug, Clone, FromRow)]
pub struct FieldRegistryRow {
    pub field_id: i64,
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub layer: String,
    pub table_name: String,
    pub column_name: String,
    pub column_type: String,
    pub expression_sql: Option<String>,
    pub mode: String,
    pub enabled: bool,
}

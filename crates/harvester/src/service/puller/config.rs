use serde_json::json;

use crate::config::AppConfig;
use crate::service::entities::PullerConfigRow;

/// Per-cycle immutable config value (§9 Design Note "Global mutable
/// config"): produced fresh each cycle from the previous effective value
/// plus the latest `puller_config` row, never mutated through shared state.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub poll_interval_seconds: u64,
    pub overlap_minutes: i64,
    pub batch_size: u32,
    pub max_retries: u32,
    pub backoff_base_seconds: f64,
    pub rate_limit_seconds: f64,
    pub opensearch_timeout_seconds: u64,
    pub clickhouse_timeout_seconds: u64,
    pub opensearch_verify_ssl: bool,
}

impl From<&AppConfig> for EffectiveConfig {
    fn from(app: &AppConfig) -> Self {
        Self {
            poll_interval_seconds: app.poll_interval_seconds,
            overlap_minutes: app.overlap_minutes,
            batch_size: app.batch_size,
            max_retries: app.max_retries,
            backoff_base_seconds: app.backoff_base_seconds,
            rate_limit_seconds: app.rate_limit_seconds,
            opensearch_timeout_seconds: app.opensearch_timeout_seconds,
            clickhouse_timeout_seconds: app.clickhouse_timeout_seconds,
            opensearch_verify_ssl: app.opensearch_verify_ssl,
        }
    }
}

fn apply_u64(current: &mut u64, value: Option<i32>, minimum: i64) {
    if let Some(v) = value {
        if i64::from(v) >= minimum {
            *current = v as u64;
        }
    }
}

fn apply_i64(current: &mut i64, value: Option<i32>, minimum: i64) {
    if let Some(v) = value {
        let v64 = i64::from(v);
        if v64 >= minimum {
            *current = v64;
        }
    }
}

fn apply_u32(current: &mut u32, value: Option<i32>, minimum: i32) {
    if let Some(v) = value {
        if v >= minimum {
            *current = v as u32;
        }
    }
}

fn apply_f64(current: &mut f64, value: Option<f64>, minimum: f64) {
    if let Some(v) = value {
        if v >= minimum {
            *current = v;
        }
    }
}

impl EffectiveConfig {
    /// Applies a `puller_config` row on top of the current value. A field
    /// that is absent, or below its per-field minimum, leaves the current
    /// value untouched (§4.4 step 1: poll ≥ 1s, batch ≥ 1, overlap ≥ 0,
    /// retries ≥ 0, backoff/rate-limit ≥ 0).
    pub fn apply_row(&mut self, row: &PullerConfigRow) {
        apply_u64(&mut self.poll_interval_seconds, row.poll_interval_seconds, 1);
        apply_i64(&mut self.overlap_minutes, row.overlap_minutes, 0);
        apply_u32(&mut self.batch_size, row.batch_size, 1);
        apply_u32(&mut self.max_retries, row.max_retries, 0);
        apply_f64(
            &mut self.backoff_base_seconds,
            row.backoff_base_seconds,
            0.0,
        );
        apply_f64(&mut self.rate_limit_seconds, row.rate_limit_seconds, 0.0);
        apply_u64(
            &mut self.opensearch_timeout_seconds,
            row.opensearch_timeout_seconds,
            1,
        );
        apply_u64(
            &mut self.clickhouse_timeout_seconds,
            row.clickhouse_timeout_seconds,
            1,
        );
        if let Some(v) = row.opensearch_verify_ssl {
            self.opensearch_verify_ssl = v;
        }
    }

    /// Snapshot stored in `worker_heartbeats.details` on each cycle entry
    /// and exit.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "poll_interval": self.poll_interval_seconds,
            "overlap_minutes": self.overlap_minutes,
            "batch_size": self.batch_size,
            "max_retries": self.max_retries,
            "backoff_base_seconds": self.backoff_base_seconds,
            "rate_limit_seconds": self.rate_limit_seconds,
            "opensearch_timeout_seconds": self.opensearch_timeout_seconds,
            "clickhouse_timeout_seconds": self.clickhouse_timeout_seconds,
            "opensearch_verify_ssl": self.opensearch_verify_ssl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_value_below_minimum() {
        let mut cfg = EffectiveConfig::from(&AppConfig::default());
        let original = cfg.batch_size;
        let row = PullerConfigRow {
            poll_interval_seconds: None,
            overlap_minutes: None,
            batch_size: Some(0),
            max_retries: None,
            backoff_base_seconds: None,
            rate_limit_seconds: None,
            opensearch_timeout_seconds: None,
            clickhouse_timeout_seconds: None,
            opensearch_verify_ssl: None,
        };
        cfg.apply_row(&row);
        assert_eq!(cfg.batch_size, original);
    }

    #[test]
    fn applies_value_at_minimum() {
        let mut cfg = EffectiveConfig::from(&AppConfig::default());
        let row = PullerConfigRow {
            poll_interval_seconds: None,
            overlap_minutes: Some(0),
            batch_size: None,
            max_retries: None,
            backoff_base_seconds: None,
            rate_limit_seconds: None,
            opensearch_timeout_seconds: None,
            clickhouse_timeout_seconds: None,
            opensearch_verify_ssl: None,
        };
        cfg.apply_row(&row);
        assert_eq!(cfg.overlap_minutes, 0);
    }
}

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::utils::format_upstream;

/// Builds the upstream query body's `query` clause: a range filter on
/// `time_field` intersected with the source's `query_filter_json`, or
/// `match_all` when neither is present (§4.4.3).
#[must_use]
pub fn build_query(
    time_field: &str,
    start_ts: Option<DateTime<Utc>>,
    end_ts: Option<DateTime<Utc>>,
    query_filter_json: Option<&Value>,
) -> Value {
    let mut filters = Vec::new();

    if start_ts.is_some() || end_ts.is_some() {
        let mut range = serde_json::Map::new();
        if let Some(s) = start_ts {
            range.insert("gte".to_string(), json!(format_upstream(s)));
        }
        if let Some(e) = end_ts {
            range.insert("lte".to_string(), json!(format_upstream(e)));
        }
        filters.push(json!({ "range": { time_field: range } }));
    }

    if let Some(extra) = query_filter_json {
        let is_present = !extra.is_null() && extra.as_object().is_none_or(|m| !m.is_empty());
        if is_present {
            filters.push(extra.clone());
        }
    }

    if filters.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": { "filter": filters } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn no_filters_yields_match_all() {
        assert_eq!(build_query("@timestamp", None, None, None), json!({"match_all": {}}));
    }

    #[test]
    fn range_only_uses_bool_filter() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 11, 50, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let query = build_query("@timestamp", Some(start), Some(end), None);
        assert_eq!(
            query,
            json!({"bool": {"filter": [{"range": {"@timestamp": {"gte": "2025-01-01T11:50:00.000Z", "lte": "2025-01-01T12:00:00.000Z"}}}]}})
        );
    }

    #[test]
    fn empty_object_filter_is_not_appended() {
        let query = build_query("@timestamp", None, None, Some(&json!({})));
        assert_eq!(query, json!({"match_all": {}}));
    }

    #[test]
    fn source_filter_is_intersected() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let extra = json!({"term": {"tenant": "acme"}});
        let query = build_query("@timestamp", Some(start), None, Some(&extra));
        let filters = query["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1], extra);
    }
}

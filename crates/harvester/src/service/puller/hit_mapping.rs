use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use harvester_io::SearchHit;

use crate::utils::{format_warehouse, parse_timestamp};

/// `_source[time_field]`, falling back to the first sort value when the
/// source field is missing or unparseable (§4.4.4).
#[must_use]
pub fn extract_event_ts(hit: &SearchHit, time_field: &str) -> Option<DateTime<Utc>> {
    let from_source = hit.source.get(time_field).and_then(parse_timestamp);
    if from_source.is_some() {
        return from_source;
    }
    hit.sort.first().and_then(parse_timestamp)
}

/// Converts a page of hits into warehouse rows (§4.4.4). Hits without a
/// parseable timestamp are skipped with a warning, not an error — the
/// batch continues (§4.4.5).
pub fn build_rows(hits: &[SearchHit], time_field: &str, source_id: i32) -> Vec<Value> {
    let ingested_at = format_warehouse(Utc::now());
    hits.iter()
        .filter_map(|hit| {
            let Some(event_ts) = extract_event_ts(hit, time_field) else {
                tracing::warn!(index = %hit.index, "skipping hit without parseable {time_field} timestamp");
                return None;
            };
            let event_id = if !hit.id.is_empty() {
                hit.id.clone()
            } else {
                hit.source
                    .get("event_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Some(json!({
                "event_id": event_id,
                "event_ts": format_warehouse(event_ts),
                "index_name": hit.index,
                "source_id": source_id.to_string(),
                "raw": serde_json::to_string(&hit.source).unwrap_or_default(),
                "ingested_at": ingested_at,
                "extras": { "_index": hit.index },
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, index: &str, source: Value, sort: Vec<Value>) -> SearchHit {
        serde_json::from_value(json!({
            "_id": id,
            "_index": index,
            "_source": source,
            "sort": sort,
        }))
        .unwrap()
    }

    #[test]
    fn hit_mapping_matches_spec_scenario_3() {
        let h = hit(
            "a",
            "logs-2025.01.01",
            json!({"@timestamp": "2025-01-01T12:00:00.123Z", "x": 1}),
            vec![json!(1_735_732_800_123i64), json!("a")],
        );
        let rows = build_rows(std::slice::from_ref(&h), "@timestamp", 7);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["event_id"], "a");
        assert_eq!(row["event_ts"], "2025-01-01 12:00:00.123");
        assert_eq!(row["index_name"], "logs-2025.01.01");
        assert_eq!(row["source_id"], "7");
        assert_eq!(row["extras"]["_index"], "logs-2025.01.01");
    }

    #[test]
    fn falls_back_to_sort_value_when_source_field_missing() {
        let h = hit(
            "b",
            "logs-2025.01.02",
            json!({"x": 1}),
            vec![json!(1_735_732_800_000i64)],
        );
        let rows = build_rows(std::slice::from_ref(&h), "@timestamp", 1);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn unparseable_timestamp_is_skipped() {
        let h = hit("c", "logs", json!({"x": 1}), vec![]);
        let rows = build_rows(std::slice::from_ref(&h), "@timestamp", 1);
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_id_falls_back_to_source_event_id() {
        let h = hit(
            "",
            "logs",
            json!({"@timestamp": "2025-01-01T00:00:00.000Z", "event_id": "synthetic"}),
            vec![],
        );
        let rows = build_rows(std::slice::from_ref(&h), "@timestamp", 1);
        assert_eq!(rows[0]["event_id"], "synthetic");
    }
}

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Epoch values above this threshold are milliseconds, at or below it are
/// seconds (§4.1). `1e11` seconds is the year 5138; `1e11` milliseconds is
/// 1973 — any real timestamp lands unambiguously on one side.
const EPOCH_MS_THRESHOLD: f64 = 1e11;

/// `null` → `None`; number → epoch seconds/milliseconds by the threshold
/// above; string → ISO-8601 (naive strings are assumed UTC); `{"$date": …}`
/// → recurse into the wrapped value.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Null => None,
        Value::Number(n) => {
            let raw = n.as_f64()?;
            let seconds = if raw > EPOCH_MS_THRESHOLD {
                raw / 1000.0
            } else {
                raw
            };
            let secs = seconds.floor() as i64;
            let nanos = ((seconds - seconds.floor()) * 1_000_000_000.0).round() as u32;
            DateTime::from_timestamp(secs, nanos)
        }
        Value::String(s) => parse_iso8601(s),
        Value::Object(map) => map.get("$date").and_then(parse_timestamp),
        _ => None,
    }
}

fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`, the shape the upstream search engine expects
/// in range queries.
#[must_use]
pub fn format_upstream(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// `YYYY-MM-DD HH:MM:SS.mmm`, the literal shape `DateTime64(3)` accepts.
#[must_use]
pub fn format_warehouse(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
            .unwrap()
            + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn epoch_seconds_below_threshold() {
        let parsed = parse_timestamp(&serde_json::json!(1_735_732_800)).unwrap();
        assert_eq!(parsed.timestamp(), 1_735_732_800);
    }

    #[test]
    fn epoch_millis_above_threshold() {
        let parsed = parse_timestamp(&serde_json::json!(1_735_732_800_123i64)).unwrap();
        assert_eq!(parsed.timestamp(), 1_735_732_800);
        assert_eq!(parsed.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn wrapped_date_recurses() {
        let parsed = parse_timestamp(&serde_json::json!({"$date": "2025-01-01T12:00:00.123Z"}))
            .unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn null_is_none() {
        assert!(parse_timestamp(&Value::Null).is_none());
    }

    #[test]
    fn upstream_roundtrip() {
        let t = sample();
        let formatted = format_upstream(t);
        assert_eq!(formatted, "2025-01-01T12:00:00.123Z");
        let parsed = parse_timestamp(&serde_json::json!(formatted)).unwrap();
        assert_eq!(parsed, t);
    }

    #[test]
    fn warehouse_roundtrip() {
        let t = sample();
        let formatted = format_warehouse(t);
        assert_eq!(formatted, "2025-01-01 12:00:00.123");
        let parsed = parse_timestamp(&serde_json::json!(formatted)).unwrap();
        assert_eq!(parsed, t);
    }
}

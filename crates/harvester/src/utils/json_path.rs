//! Compiles a parsing field's `json_path` cell into a ClickHouse-dialect
//! SQL expression over the raw landing table's `raw` column (§4.5.2), and
//! builds the dataset predicate that filters a continuous view (§4.5.3).

use crate::error::HarvesterError;
use crate::utils::identifier::require_identifier;

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Splits a `json_path` cell into its newline/comma-separated fallback list.
#[must_use]
pub fn split_paths(value: &str) -> Vec<String> {
    value
        .lines()
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn normalize_json_path(path: &str) -> String {
    if path.starts_with('$') {
        path.to_string()
    } else if path.starts_with('@') {
        format!("$.\"{path}\"")
    } else {
        format!("$.{path}")
    }
}

fn unwrap_nullable(column_type: &str) -> &str {
    let trimmed = column_type.trim();
    trimmed
        .strip_prefix("Nullable(")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn build_json_extract_path(path: &str) -> Vec<String> {
    let stripped = path.strip_prefix('$').unwrap_or(path);
    let trimmed = stripped.trim_matches('.');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('.')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn array_extract_expr(path: &str, column_type: &str) -> String {
    let parts = build_json_extract_path(path);
    match parts.as_slice() {
        [] => format!("CAST([] AS {column_type})"),
        [only] => format!("JSONExtract(raw, '{only}', '{column_type}')"),
        _ => {
            let mut expr = format!("JSONExtractRaw(raw, '{}')", parts[0]);
            for part in &parts[1..parts.len() - 1] {
                expr = format!("JSONExtractRaw({expr}, '{part}')");
            }
            format!(
                "JSONExtract({expr}, '{}', '{column_type}')",
                parts[parts.len() - 1]
            )
        }
    }
}

fn numeric_coercer(prefix: &str, kind_prefix: &str, base_type: &str) -> Option<String> {
    let bits = base_type.strip_prefix(prefix)?;
    Some(if !bits.is_empty() && bits.chars().all(|c| c.is_ascii_digit()) {
        format!("to{kind_prefix}{bits}OrNull")
    } else {
        format!("to{kind_prefix}64OrNull")
    })
}

fn coerce_expression(expr: &str, base_type: &str) -> String {
    if base_type.is_empty() {
        return expr.to_string();
    }
    if base_type.starts_with("DateTime64") || base_type.starts_with("DateTime") {
        return format!("parseDateTime64BestEffortOrNull({expr})");
    }
    if base_type.starts_with("IPv6") {
        return format!("toIPv6OrNull({expr})");
    }
    if let Some(func) = numeric_coercer("UInt", "UInt", base_type) {
        return format!("{func}({expr})");
    }
    if let Some(func) = numeric_coercer("Int", "Int", base_type) {
        return format!("{func}({expr})");
    }
    if base_type.starts_with("Float") {
        return format!("toFloat64OrNull({expr})");
    }
    format!("nullIf({expr}, '')")
}

fn build_value_expr(path: &str, column_type: &str) -> String {
    let base_type = unwrap_nullable(column_type);
    if let Some(rest) = path.strip_prefix("epoch_ms:") {
        let json_path = normalize_json_path(rest.trim());
        return format!(
            "fromUnixTimestamp64Milli(toInt64OrNull(JSON_VALUE(raw, '{json_path}')))"
        );
    }
    let json_path = normalize_json_path(path);
    coerce_expression(&format!("JSON_VALUE(raw, '{json_path}')"), base_type)
}

/// Compiles the full fallback chain for one parsing column. A `__`-prefixed
/// path is a raw-table column reference, validated through the identifier
/// guard rather than interpreted as JSON. An empty `json_path` compiles to
/// `CAST(NULL AS <type>)` (§9 Design Note: ambiguous behavior preserved
/// as-is).
///
/// # Errors
/// Returns [`HarvesterError::IdentifierInvalid`] if a `__`-prefixed path's
/// remainder is not a safe identifier.
pub fn build_column_expr(column_type: &str, json_path: &str) -> Result<String, HarvesterError> {
    let paths = split_paths(json_path);
    if paths.is_empty() {
        return Ok(format!("CAST(NULL AS {column_type})"));
    }
    let base_type = unwrap_nullable(column_type);

    if let Some(element_type) = base_type.strip_prefix("Array(") {
        let element_type = element_type.strip_suffix(')').unwrap_or(element_type);
        let mut exprs = Vec::with_capacity(paths.len());
        for path in &paths {
            if let Some(source_col) = path.strip_prefix("__") {
                require_identifier(source_col)?;
                exprs.push(source_col.to_string());
            } else {
                exprs.push(array_extract_expr(path, base_type));
            }
        }
        let _ = element_type;
        let mut combined = exprs[0].clone();
        for expr in &exprs[1..] {
            combined = format!("ifNull({combined}, {expr})");
        }
        return Ok(format!("ifNull({combined}, [])"));
    }

    let mut exprs = Vec::with_capacity(paths.len());
    for path in &paths {
        if let Some(source_col) = path.strip_prefix("__") {
            require_identifier(source_col)?;
            exprs.push(source_col.to_string());
        } else {
            exprs.push(build_value_expr(path, column_type));
        }
    }
    if exprs.len() == 1 {
        Ok(exprs.into_iter().next().expect("len checked above"))
    } else {
        Ok(format!("coalesce({})", exprs.join(", ")))
    }
}

/// Dataset predicate for a continuous view (§4.5.3). The three well-known
/// datasets get an explicit provider/module/namespace predicate; any other
/// non-empty dataset compares `$.event.{dataset,module,provider}`; an
/// empty dataset admits all rows.
#[must_use]
pub fn dataset_filter(dataset: &str) -> String {
    let key = dataset.trim().to_lowercase();
    match key.as_str() {
        "suricata" => "JSONHas(raw, 'suricata') OR JSON_VALUE(raw, '$.event.module') = 'suricata' OR JSON_VALUE(raw, '$.event.provider') = 'suricata'".to_string(),
        "wazuh" => "JSON_VALUE(raw, '$.event.provider') = 'wazuh' OR JSONHas(raw, 'wazuh')".to_string(),
        "zeek" => "JSONHas(raw, 'zeek') OR JSON_VALUE(raw, '$.event.module') = 'zeek' OR JSON_VALUE(raw, '$.event.provider') = 'zeek'".to_string(),
        "" => "1 = 1".to_string(),
        other => {
            let safe = escape_literal(other);
            format!(
                "JSON_VALUE(raw, '$.event.dataset') = '{safe}' OR JSON_VALUE(raw, '$.event.module') = '{safe}' OR JSON_VALUE(raw, '$.event.provider') = '{safe}'"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_newline_and_comma_separated_paths() {
        let paths = split_paths("a.b,c.d\ne.f");
        assert_eq!(paths, vec!["a.b", "c.d", "e.f"]);
    }

    #[test]
    fn empty_json_path_casts_null() {
        let expr = build_column_expr("Nullable(String)", "").unwrap();
        assert_eq!(expr, "CAST(NULL AS Nullable(String))");
    }

    #[test]
    fn ipv6_fallback_coalesce_matches_spec_scenario_5() {
        let expr = build_column_expr("Nullable(IPv6)", "$.source.ip\n$.client.ip").unwrap();
        assert_eq!(
            expr,
            "coalesce(toIPv6OrNull(JSON_VALUE(raw, '$.source.ip')), toIPv6OrNull(JSON_VALUE(raw, '$.client.ip')))"
        );
    }

    #[test]
    fn single_path_has_no_coalesce_wrapper() {
        let expr = build_column_expr("Nullable(UInt32)", "$.count").unwrap();
        assert_eq!(expr, "toUInt32OrNull(JSON_VALUE(raw, '$.count'))");
    }

    #[test]
    fn epoch_ms_prefix_uses_from_unix_timestamp() {
        let expr = build_column_expr("DateTime64(3)", "epoch_ms:$.ts").unwrap();
        assert_eq!(
            expr,
            "fromUnixTimestamp64Milli(toInt64OrNull(JSON_VALUE(raw, '$.ts')))"
        );
    }

    #[test]
    fn dunder_prefixed_path_references_raw_table_column() {
        let expr = build_column_expr("String", "__event_id").unwrap();
        assert_eq!(expr, "event_id");
    }

    #[test]
    fn dunder_prefixed_path_rejects_unsafe_column() {
        assert!(build_column_expr("String", "__a; DROP TABLE x").is_err());
    }

    #[test]
    fn at_prefixed_path_is_quoted() {
        let expr = build_column_expr("Nullable(String)", "@timestamp").unwrap();
        assert_eq!(expr, "nullIf(JSON_VALUE(raw, '$.\"@timestamp\"'), '')");
    }

    #[test]
    fn array_type_single_segment_uses_json_extract() {
        let expr = build_column_expr("Array(String)", "$.tags").unwrap();
        assert_eq!(expr, "ifNull(JSONExtract(raw, 'tags', 'Array(String)'), [])");
    }

    #[test]
    fn dataset_filter_empty_admits_all() {
        assert_eq!(dataset_filter(""), "1 = 1");
    }

    #[test]
    fn dataset_filter_well_known_is_explicit() {
        assert!(dataset_filter("suricata").contains("JSONHas(raw, 'suricata')"));
    }

    #[test]
    fn dataset_filter_generic_escapes_literal() {
        let filter = dataset_filter("o'brien");
        assert!(filter.contains("o''brien"));
    }
}

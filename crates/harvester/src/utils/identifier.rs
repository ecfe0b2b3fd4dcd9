use lazy_regex::regex;

use crate::error::HarvesterError;

/// Any name interpolated into warehouse SQL (project id, database, table,
/// column) must match this shape — the warehouse protocol has no bind
/// parameters for identifiers (§4.1).
fn is_valid(value: &str) -> bool {
    !value.is_empty() && regex!(r"^[A-Za-z0-9_]+$").is_match(value)
}

/// # Errors
/// Returns [`HarvesterError::IdentifierInvalid`] if `value` contains any
/// byte outside `[A-Za-z0-9_]`, or is empty.
pub fn require_identifier(value: &str) -> Result<&str, HarvesterError> {
    if is_valid(value) {
        Ok(value)
    } else {
        Err(HarvesterError::IdentifierInvalid(value.to_string()))
    }
}

/// Backtick-quotes an identifier after validating it.
///
/// # Errors
/// Same as [`require_identifier`].
pub fn quote_identifier(value: &str) -> Result<String, HarvesterError> {
    require_identifier(value)?;
    Ok(format!("`{value}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alnum_and_underscore() {
        assert!(require_identifier("demo_bronze_1").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(require_identifier("").is_err());
    }

    #[test]
    fn rejects_sql_injection_attempt() {
        assert!(require_identifier("x; DROP TABLE foo --").is_err());
    }

    #[test]
    fn rejects_dotted_qualification() {
        assert!(require_identifier("db.table").is_err());
    }

    #[test]
    fn quote_wraps_in_backticks() {
        assert_eq!(quote_identifier("os_events_raw").unwrap(), "`os_events_raw`");
    }

    #[test]
    fn quote_rejects_unsafe_input_without_emitting_sql() {
        assert!(quote_identifier("a`b").is_err());
    }
}

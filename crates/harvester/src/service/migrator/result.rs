use serde::Serialize;

/// One row of `migrate apply --json` output (§6 CLI): the outcome of
/// applying a single bronze table or field-registry column.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub unit: String,
    pub target: Option<String>,
    pub status: String,
    pub error: Option<String>,
}

impl MigrationResult {
    pub fn applied(unit: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            target: Some(target.into()),
            status: "applied".to_string(),
            error: None,
        }
    }

    pub fn skipped(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            target: None,
            status: "skipped".to_string(),
            error: Some(reason.into()),
        }
    }

    pub fn error(unit: impl Into<String>, target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            target: Some(target.into()),
            status: "error".to_string(),
            error: Some(error.into()),
        }
    }
}

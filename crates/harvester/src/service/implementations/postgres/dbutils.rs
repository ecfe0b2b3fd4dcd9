use tracing::warn;

/// Converts a metadata read/write failure into `None`, logging it, so the
/// caller can keep going with its previously-known state (§4.4.5:
/// "Metadata read fails (puller_config)" keeps the in-memory config;
/// "Heartbeat write fails" does not abort the cycle).
pub(crate) fn log_and_continue<T>(operation: &str, result: Result<T, sqlx::Error>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, operation, "metadata operation failed; continuing with prior state");
            None
        }
    }
}

/// Errors raised by the upstream and warehouse HTTP clients.
///
/// `Transient` and `Semantic` are kept distinct so the retry policy in
/// [`crate::retry`] can tell a connection hiccup from a request the server
/// has already rejected on its merits (§7 `UPSTREAM_TRANSIENT` /
/// `UPSTREAM_SEMANTIC`).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network failure, timeout, or 5xx: worth retrying.
    #[error("transient request failure: {0}")]
    Transient(String),

    /// 4xx other than a 404 on index listing: never retried.
    #[error("request rejected with status {status}: {body}")]
    Semantic { status: u16, body: String },

    /// Retries were exhausted without a successful response.
    #[error("request retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// The response body could not be decoded as expected.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if status.is_client_error() {
                return ClientError::Semantic {
                    status: status.as_u16(),
                    body: err.to_string(),
                };
            }
        }
        ClientError::Transient(err.to_string())
    }
}

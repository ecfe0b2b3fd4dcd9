use std::{future::Future, time::Duration};

use crate::error::ClientError;

/// Exponential backoff parameters shared by the upstream and warehouse
/// clients (§4.2, §4.3): `max_retries` attempts, sleeping
/// `backoff_base * 2^attempt` between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Runs `op` until it succeeds, a semantic error is returned (never
/// retried), or `policy.max_retries` attempts have been made.
///
/// `max_retries = 0` means exactly one attempt, matching the source's
/// `range(config.MAX_RETRIES)` loop where a retry count of zero never
/// enters the loop body... except the source always attempts at least
/// once outside the retry counter; here attempt `0` is always tried and
/// `max_retries` bounds the number of *retries after* that attempt.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(ClientError::Semantic { status, body }) => {
                return Err(ClientError::Semantic { status, body });
            }
            Err(err) => {
                if attempt >= policy.max_retries {
                    return Err(ClientError::Exhausted {
                        attempts: attempt + 1,
                        last: err.to_string(),
                    });
                }
                let delay = policy.delay_for(attempt);
                tracing::warn!(attempt, delay_ms = %delay.as_millis(), error = %err, "request failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let attempts = AtomicU32::new(0);
        let result = retry(policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ClientError::Transient("boom".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhausts_after_max_retries() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let attempts = AtomicU32::new(0);
        let result: Result<(), ClientError> = retry(policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::Transient("boom".into())) }
        })
        .await;
        assert!(matches!(result, Err(ClientError::Exhausted { attempts: 3, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_never_retries_semantic_errors() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let attempts = AtomicU32::new(0);
        let result: Result<(), ClientError> = retry(policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ClientError::Semantic {
                    status: 400,
                    body: "bad request".into(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(ClientError::Semantic { status: 400, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

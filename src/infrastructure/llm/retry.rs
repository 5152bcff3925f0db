//! Retry policy with exponential backoff for completion API requests.
//!
//! Backoff doubles with each retry, capped at `max_backoff_ms`. Only
//! transient failures (rate limits, 5xx, network errors) are retried.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Classified completion API error.
#[derive(Debug, Error)]
pub enum CompletionApiError {
    /// 429 from the API.
    #[error("Rate limited by completion API")]
    RateLimited,

    /// 5xx or overloaded.
    #[error("Completion API server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// 4xx other than 429. Not retried.
    #[error("Completion API rejected the request ({status}): {body}")]
    ClientError { status: u16, body: String },

    /// Connection failure or timeout.
    #[error("Completion API network error: {0}")]
    Network(String),

    /// Unparseable response body. Not retried.
    #[error("Completion API response was unreadable: {0}")]
    InvalidResponse(String),
}

impl CompletionApiError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 | 529 => Self::RateLimited,
            500..=599 => Self::ServerError { status, body },
            _ => Self::ClientError { status, body },
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError { .. } | Self::Network(_)
        )
    }
}

/// Retry policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Run the operation, retrying transient failures with exponential
    /// backoff.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, CompletionApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CompletionApiError>>,
    {
        let mut backoff_ms = self.initial_backoff_ms;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        backoff_ms,
                        error = %e,
                        "transient completion API failure; retrying"
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms * 2).min(self.max_backoff_ms);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_status_classification() {
        assert!(CompletionApiError::from_status(429, String::new()).is_transient());
        assert!(CompletionApiError::from_status(503, String::new()).is_transient());
        assert!(CompletionApiError::from_status(529, String::new()).is_transient());
        assert!(!CompletionApiError::from_status(400, String::new()).is_transient());
        assert!(!CompletionApiError::from_status(401, String::new()).is_transient());
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let policy = RetryPolicy::new(3, 1, 10);
        let calls = AtomicU32::new(0);

        let result = policy
            .execute(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CompletionApiError::RateLimited)
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let policy = RetryPolicy::new(3, 1, 10);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CompletionApiError::ClientError {
                    status: 400,
                    body: "bad request".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let policy = RetryPolicy::new(2, 1, 10);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CompletionApiError::Network("refused".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

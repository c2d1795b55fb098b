//! Retry logic with exponential backoff for transport calls.
//!
//! Retries only on transient transport errors (connection failures,
//! timeouts). Any HTTP response, whatever its status, is returned to the
//! caller without retry.

use std::time::Duration;

/// Backoff parameters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry; doubles each time.
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Whether a failed request may be sent again: it never reached the server
/// or did not answer in time. Request-building, redirect and body errors
/// are returned at once.
fn is_retryable(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

/// Send an HTTP request with exponential backoff retry on transport errors.
///
/// The closure `f` is called up to `policy.retries + 1` times. Only
/// connection and timeout failures trigger a retry; the caller is
/// responsible for inspecting the response status code.
pub(crate) async fn retry_send<F, Fut>(
    policy: RetryPolicy,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..policy.retries {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = policy.retries,
                    "transport request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    // Final attempt, no more retries.
    f().await
}

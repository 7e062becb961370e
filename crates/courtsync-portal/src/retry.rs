//! Fixed-backoff retry for availability fetches.
//!
//! Only 5xx-class failures are retried, and only by the availability read —
//! nothing is ever retried once a cart-mutating call has run; compensation is
//! the recovery strategy there.

use std::future::Future;
use std::time::Duration;

use crate::PortalError;

/// Runs `operation` up to `max_attempts` times, sleeping `backoff` between
/// attempts. Non-5xx errors are returned immediately.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-retryable error.
pub async fn retry_on_server_error<T, F, Fut>(
    max_attempts: u32,
    backoff: Duration,
    mut operation: F,
) -> Result<T, PortalError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortalError>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_server_error() || attempt >= max_attempts {
                    return Err(err);
                }
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "portal availability returned a server error, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

//! Async retry utilities with backoff

use std::time::Duration;

/// Default maximum retry attempts for graph store requests
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay in milliseconds for exponential backoff
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Exponential delay before retry number `attempt` (1-based)
pub fn exponential_delay(attempt: u32, base_delay_ms: u64) -> Duration {
    Duration::from_millis(base_delay_ms.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1))))
}

/// Incremental delay after failed attempt number `attempt` (1-based).
///
/// Grows linearly and is strictly increasing in `attempt` for any non-zero base.
pub fn incremental_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(attempt.max(1))
}

/// Retry an async operation with exponential backoff.
///
/// Only errors accepted by `is_retryable` are retried. Returns the value and
/// the number of attempts on success, or `Err((error, attempts))` on failure.
pub async fn retry_with_backoff_async<F, Fut, T, E, R>(
    max_attempts: u32,
    base_delay_ms: u64,
    is_retryable: R,
    mut operation: F,
) -> Result<(T, u32), (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok((value, attempts)),
            Err(e) => {
                if attempts >= max_attempts || !is_retryable(&e) {
                    return Err((e, attempts));
                }
                let delay = exponential_delay(attempts, base_delay_ms);
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

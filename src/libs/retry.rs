//! Jittered exponential backoff for transient source/target faults.
//!
//! The metered VPN link to the source database and the target warehouse
//! both see occasional transient disconnects. Operations that talk to
//! either one retry through [`with_backoff`] rather than failing on the
//! first hiccup.

use std::time::Duration;

use futures::future::BoxFuture;
use rand::Rng;
use tracing::warn;

use crate::libs::error::EtlError;

/// Backoff schedule: base 2s, doubling each attempt, capped at 32s.
pub const BASE_DELAY: Duration = Duration::from_secs(2);
pub const MAX_DELAY: Duration = Duration::from_secs(32);
pub const MAX_ATTEMPTS: u32 = 5;

/// Retries `op` up to [`MAX_ATTEMPTS`] times, backing off with full jitter
/// between attempts. Only errors for which `is_transient` returns `true`
/// are retried; anything else (and the final exhausted attempt) is returned
/// to the caller immediately.
pub async fn with_backoff<'b, T, F>(operation: &str, mut op: F) -> Result<T, EtlError>
where
    F: FnMut() -> BoxFuture<'b, Result<T, EtlError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS && err.is_transient() => {
                let delay = jittered_delay(attempt);
                warn!(operation, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

pub(crate) fn jittered_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(4);
    let unjittered = BASE_DELAY.saturating_mul(1u32 << exponent).min(MAX_DELAY);
    let jitter_ms = rand::rng().random_range(0..=unjittered.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn jittered_delay_never_exceeds_cap() {
        for attempt in 1..=10 {
            assert!(jittered_delay(attempt) <= MAX_DELAY);
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff("test-op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n < 2 {
                    Err(EtlError::SourceUnavailable(anyhow::anyhow!("connection reset")))
                } else {
                    Ok(42)
                }
            })
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), EtlError> = with_backoff("test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Err(EtlError::UnknownTable("orders".into())) })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), EtlError> = with_backoff("test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Err(EtlError::TargetUnavailable(anyhow::anyhow!("timeout"))) })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}

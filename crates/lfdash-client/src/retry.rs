//! Retry with exponential back-off and jitter for throttled proxy calls.
//!
//! Only [`ProxyError::Throttled`] is retried. Transport failures and non-2xx
//! statuses surface to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::ProxyError;

const MAX_DELAY_MS: u64 = 60_000;

pub(crate) fn is_retriable(err: &ProxyError) -> bool {
    matches!(err, ProxyError::Throttled { .. })
}

/// Delay before retry number `attempt` (1-based).
///
/// A server-supplied `Retry-After` wins; otherwise
/// `backoff_base_ms * 2^(attempt - 1)` with ±25 % jitter, capped at 60 s.
fn backoff_delay(err: &ProxyError, attempt: u32, backoff_base_ms: u64) -> Duration {
    if let ProxyError::Throttled {
        retry_after_ms: Some(ms),
        ..
    } = err
    {
        return Duration::from_millis((*ms).min(MAX_DELAY_MS));
    }
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    Duration::from_millis(jittered)
}

/// Runs `operation` with up to `max_retries` additional attempts on throttling.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ProxyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProxyError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = backoff_delay(&err, attempt, backoff_base_ms);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "proxy throttled request, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn throttled(retry_after_ms: Option<u64>) -> ProxyError {
        ProxyError::Throttled {
            url: "https://proxy.example.com/Visit/GetAllVisits".to_owned(),
            retry_after_ms,
        }
    }

    fn status(code: u16) -> ProxyError {
        ProxyError::Status {
            status: code,
            url: "https://proxy.example.com/x".to_owned(),
            upstream_status: None,
            upstream_url: None,
            body: String::new(),
        }
    }

    #[test]
    fn only_throttling_is_retriable() {
        assert!(is_retriable(&throttled(None)));
        assert!(!is_retriable(&status(500)));
        assert!(!is_retriable(&status(403)));
    }

    #[test]
    fn retry_after_overrides_computed_backoff() {
        let delay = backoff_delay(&throttled(Some(7_000)), 1, 100);
        assert_eq!(delay, Duration::from_millis(7_000));
    }

    #[test]
    fn computed_backoff_grows_and_stays_within_jitter() {
        let first = backoff_delay(&throttled(None), 1, 1_000).as_millis();
        let third = backoff_delay(&throttled(None), 3, 1_000).as_millis();
        assert!((750..=1_250).contains(&first), "first={first}");
        assert!((3_000..=5_000).contains(&third), "third={third}");
    }

    #[test]
    fn backoff_is_capped() {
        let delay = backoff_delay(&throttled(Some(10 * 60_000)), 1, 0);
        assert_eq!(delay, Duration::from_millis(60_000));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ProxyError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_throttled_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(throttled(None))
                } else {
                    Ok::<u32, ProxyError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ProxyError>(throttled(None))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(ProxyError::Throttled { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_status_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ProxyError>(status(500))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ProxyError::Status { status: 500, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_retry_after_before_next_attempt() {
        let start = tokio::time::Instant::now();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(1, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(throttled(Some(2_000)))
                } else {
                    Ok::<(), ProxyError>(())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(2_000));
    }
}

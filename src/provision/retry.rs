use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Pause between connection attempts
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Calls `connect` until it succeeds or `timeout` has elapsed.
///
/// After each failure the establisher waits `interval` unless the overall
/// timeout fires first, in which case the most recent error is returned.
/// The attempt count is unbounded.
pub async fn establish<T, E, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        let err = match connect().await {
            Ok(handle) => return Ok(handle),
            Err(err) => err,
        };
        warn!("Retryable error: {}", err);

        tokio::select! {
            biased;
            _ = &mut deadline => return Err(err),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_success() {
        let attempts = AtomicUsize::new(0);
        let result: Result<&str, String> = establish(
            Duration::from_secs(30),
            DEFAULT_RETRY_INTERVAL,
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(format!("refused #{n}"))
                    } else {
                        Ok("connected")
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok("connected"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_last_error() {
        let attempts = AtomicUsize::new(0);
        let start = Instant::now();
        let timeout = Duration::from_secs(10);

        let result: Result<(), String> = establish(timeout, DEFAULT_RETRY_INTERVAL, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("refused #{n}")) }
        })
        .await;

        let attempts = attempts.load(Ordering::SeqCst);
        assert_eq!(result, Err(format!("refused #{}", attempts - 1)));
        assert!(start.elapsed() <= timeout + DEFAULT_RETRY_INTERVAL);
        // attempts at t = 0, 3, 6, 9; the deadline fires during the last wait
        assert_eq!(attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_makes_single_attempt() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), &str> = establish(Duration::ZERO, DEFAULT_RETRY_INTERVAL, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("unreachable") }
        })
        .await;

        assert_eq!(result, Err("unreachable"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Hard cap on engine attempts: one call plus at most one retry.
pub const MAX_ENGINE_ATTEMPTS: u32 = 2;

/// Attempt budget and backoff for one outbound operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Including the first call
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Applied to the delay after every retry
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Create a new retry configuration. Zero attempts is treated as one.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Preset: engine calls. Attempts are clamped to `1..=MAX_ENGINE_ATTEMPTS`
    /// so worst-case latency stays bounded.
    /// Delay: 250ms before the single retry
    pub fn engine_call(max_attempts: u32) -> Self {
        Self::new(
            max_attempts.clamp(1, MAX_ENGINE_ATTEMPTS),
            Duration::from_millis(250),
        )
        .with_max_delay(Duration::from_millis(250))
        .with_backoff_multiplier(1.0)
    }

    /// Attempts are 0-indexed; the first one never waits.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::engine_call(1)
    }
}

/// Run `operation`, retrying while `should_retry` accepts the error and the
/// attempt budget lasts. The last error is returned unchanged.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(
                "{}: Retry attempt {}/{} after {:?}",
                operation_name,
                attempt + 1,
                max_attempts,
                delay
            );
            sleep(delay).await;
        }

        let e = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "{}: Succeeded on attempt {}/{}",
                        operation_name,
                        attempt + 1,
                        max_attempts
                    );
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        if !should_retry(&e) {
            debug!(
                "{}: Error is not retryable, failing immediately: {}",
                operation_name, e
            );
            return Err(e);
        }

        let remaining = max_attempts - attempt - 1;
        if remaining == 0 {
            warn!(
                "{}: All {} attempts failed. Last error: {}",
                operation_name, max_attempts, e
            );
            return Err(e);
        }

        warn!(
            "{}: Attempt {}/{} failed ({}), {} retries remaining",
            operation_name,
            attempt + 1,
            max_attempts,
            e,
            remaining
        );
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    // ==================== Config Tests ====================

    #[test]
    fn test_engine_call_is_capped() {
        assert_eq!(RetryConfig::engine_call(0).max_attempts, 1);
        assert_eq!(RetryConfig::engine_call(1).max_attempts, 1);
        assert_eq!(RetryConfig::engine_call(2).max_attempts, 2);
        assert_eq!(RetryConfig::engine_call(10).max_attempts, MAX_ENGINE_ATTEMPTS);
    }

    #[test]
    fn test_default_is_single_attempt() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.initial_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_new_never_allows_zero_attempts() {
        assert_eq!(RetryConfig::new(0, Duration::from_millis(1)).max_attempts, 1);
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new(4, Duration::from_secs(1)).with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_respects_max() {
        let config = RetryConfig::new(10, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3))
            .with_backoff_multiplier(2.0);

        // Attempt 4 would be 8 seconds, but max is 3
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(3));
    }

    // ==================== with_retry_if Tests ====================

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let config = RetryConfig::new(2, Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<u32, &str> = with_retry_if(
            &config,
            "test",
            || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_retry() {
        let config = RetryConfig::new(2, Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<u32, &str> = with_retry_if(
            &config,
            "test",
            || {
                let c = counter_clone.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("server error 503")
                    } else {
                        Ok(7)
                    }
                }
            },
            |e: &&str| e.contains("503"),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let config = RetryConfig::new(2, Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<u32, &str> = with_retry_if(
            &config,
            "test",
            || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("client error 400")
                }
            },
            |e: &&str| !e.contains("400"),
        )
        .await;

        assert_eq!(result.unwrap_err(), "client error 400");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_preset_never_exceeds_two_calls() {
        let config = RetryConfig::engine_call(5);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<u32, String> = with_retry_if(
            &config,
            "engine",
            || {
                let c = counter_clone.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("server error {}", n))
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap_err(), "server error 1");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}

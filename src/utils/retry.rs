use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Bounded Retry with Exponential Backoff
// ============================================================================
//
// An explicit loop: attempt, and on failure sleep for the current delay, then
// double it (capped) until `max_attempts` is reached. The terminal error is
// always handed back to the caller.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor applied after every failed attempt
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Retries back to back, without sleeping in between.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delays slept between consecutive attempts (`max_attempts - 1` entries).
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.initial_delay.min(self.max_delay);

        for _ in 1..self.max_attempts.max(1) {
            delays.push(delay);
            delay = self.next_delay(delay);
        }

        delays
    }

    /// Worst-case time spent sleeping across all attempts.
    pub fn total_backoff(&self) -> Duration {
        self.backoff_schedule().into_iter().sum()
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let next = Duration::from_secs_f64(current.as_secs_f64() * self.multiplier);
        next.min(self.max_delay)
    }
}

/// Outcome of a retried operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// An attempt succeeded
    Success { value: T, attempts: u32 },
    /// Every allowed attempt failed; carries the last error
    Exhausted { error: E, attempts: u32 },
    /// The error was not retryable, so the loop stopped early
    Aborted { error: E, attempts: u32 },
}

/// Retry every failure until the attempt budget runs out.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_when(config, |_| true, operation).await
}

/// Retry only the failures `should_retry` accepts; anything else aborts.
pub async fn retry_when<F, Fut, T, E, P>(
    config: &RetryConfig,
    should_retry: P,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay.min(config.max_delay);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return RetryResult::Success { value, attempts: attempt };
            }
            Err(error) => error,
        };

        if !should_retry(&error) {
            tracing::debug!(attempt, error = %error, "Non-retryable failure");
            return RetryResult::Aborted { error, attempts: attempt };
        }

        if attempt >= max_attempts {
            tracing::warn!(attempt, error = %error, "Operation failed after all attempts");
            return RetryResult::Exhausted { error, attempts: attempt };
        }

        tracing::warn!(
            attempt,
            max_attempts,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "Operation failed, retrying after delay"
        );

        if !delay.is_zero() {
            sleep(delay).await;
        }
        delay = config.next_delay(delay);
    }
}

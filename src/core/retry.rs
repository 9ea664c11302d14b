//! Retry logic with exponential backoff and jitter.
//!
//! Used by the loader to retry transient artifact fetch failures. Whether
//! an error is worth retrying is decided by the caller.

use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,

    /// Initial delay before first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 = double each time).
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays (prevents thundering herd).
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryConfig {
    /// Create a config with no retries (fail fast).
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Create a config for network operations.
    pub fn network() -> Self {
        Self { max_attempts: 3, ..Self::no_retry() }
    }

    /// Calculate delay for the given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Add up to 25% jitter
            let jitter_factor = 1.0 + (rand_jitter() * 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0) without external deps.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,

    /// Total time spent (including delays).
    pub total_time: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether more than one attempt was made.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry an async operation while `should_retry` accepts its error.
pub async fn retry_async<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let start = std::time::Instant::now();
    let mut attempts = 0;
    let max_attempts = config.max_attempts + 1; // +1 for initial attempt

    loop {
        attempts += 1;
        let result = operation().await;

        let give_up = match &result {
            Ok(_) => true,
            Err(e) => attempts >= max_attempts || !should_retry(e),
        };

        if give_up {
            return RetryResult { result, attempts, total_time: start.elapsed() };
        }

        let delay = config.delay_for_attempt(attempts);
        tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Retrying");
        tokio::time::sleep(delay).await;
    }
}

//! Retry Mechanism Module
//!
//! Bounded retries with exponential backoff for single provider round-trips.
//! The executor owns no state across calls; every `execute` is independent and
//! may run concurrently with any number of others. Backoff delays suspend only
//! the awaiting task (`tokio::time::sleep`), never a worker thread.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::GatewayError;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay scheduled after the first failed attempt
    pub initial_delay: Duration,
    /// Optional upper bound on any single delay; uncapped by default
    pub max_delay: Option<Duration>,
    /// Backoff multiplier applied per failed attempt
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub use_jitter: bool,
    /// Maximum jitter percentage (0.0 to 1.0)
    pub jitter_factor: f64,
    /// Custom retry condition function
    pub retry_condition: Option<fn(&GatewayError) -> bool>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: None,
            backoff_multiplier: 2.0,
            use_jitter: false,
            jitter_factor: 0.1,
            retry_condition: None,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy (3 attempts, 1s base delay, multiplier 2)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts; values below 1 are raised to 1
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    /// Set initial delay
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Cap every single delay at `delay`
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set backoff multiplier
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub const fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Set jitter factor
    pub const fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Set custom retry condition
    pub fn with_retry_condition(mut self, condition: fn(&GatewayError) -> bool) -> Self {
        self.retry_condition = Some(condition);
        self
    }

    /// Check if an error should be retried
    pub fn should_retry(&self, error: &GatewayError) -> bool {
        if let Some(condition) = self.retry_condition {
            condition(error)
        } else {
            error.is_retryable()
        }
    }

    /// Delay scheduled after the failed attempt `attempt` (1-indexed):
    /// `initial_delay * backoff_multiplier^(attempt - 1)`, capped at `max_delay`
    /// when one is set.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base_delay = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);

        let delay = Duration::from_millis(base_delay as u64);
        let delay = match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        };

        if self.use_jitter {
            self.add_jitter(delay)
        } else {
            delay
        }
    }

    /// Sum of every delay a fully exhausted call would sleep (jitter excluded).
    pub fn total_backoff(&self) -> Duration {
        let plain = self.clone().with_jitter(false);
        (1..self.max_attempts).map(|k| plain.calculate_delay(k)).sum()
    }

    /// Add jitter to a delay
    fn add_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::thread_rng();
        let jitter_range = delay.as_millis() as f64 * self.jitter_factor;
        if jitter_range <= 0.0 {
            return delay;
        }
        let jitter = rng.gen_range(-jitter_range..=jitter_range);

        let new_delay = delay.as_millis() as f64 + jitter;
        Duration::from_millis(new_delay.max(0.0) as u64)
    }
}

/// Retry executor that handles the actual retry logic
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached. The last failure is returned unchanged.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            tracing::debug!(attempt, max_attempts, "provider attempt");
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !self.policy.should_retry(&error) {
                tracing::warn!(attempt, error = %error, "attempt failed with a final error");
                return Err(error);
            }
            if attempt >= max_attempts {
                tracing::warn!(attempt, error = %error, "retries exhausted");
                return Err(error);
            }

            let delay = self.policy.calculate_delay(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Convenience function to retry an operation with an explicit policy
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, operation: F) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    RetryExecutor::new(policy.clone()).execute(operation).await
}

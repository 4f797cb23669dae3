//! Retry with exponential backoff for the fetch boundary

use crate::error::ResolveError;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::warn;

/// Boxed future returned by a retried operation
pub type RetryFuture<T> = Pin<Box<dyn Future<Output = Result<T, ResolveError>> + Send>>;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based), without jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

/// Retry executor
///
/// Only errors reporting [`ResolveError::is_retryable`] are retried; parse and
/// decryption failures are deterministic and returned immediately.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub fn new() -> Self {
        Self::with_config(RetryConfig::default())
    }

    /// Create a new retry executor with configuration
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute a function with retry logic
    pub async fn execute<F, T>(&self, mut func: F) -> Result<T, ResolveError>
    where
        F: FnMut() -> RetryFuture<T>,
    {
        let mut attempt = 0;
        loop {
            let error = match func().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.config.max_retries {
                return Err(error);
            }

            let delay = self.with_jitter(self.config.delay_for(attempt));
            warn!(
                "Attempt {} failed ({}), retrying in {:?}",
                attempt + 1,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn with_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return delay;
        }
        let range = delay.as_millis() as f64 * self.config.jitter_factor;
        let jitter = rand::random::<f64>() * range;
        delay + Duration::from_millis(jitter as u64)
    }
}

/// Retry configuration builder
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.config.initial_delay = initial_delay;
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.config.max_delay = max_delay;
        self
    }

    pub fn backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.config.backoff_multiplier = backoff_multiplier;
        self
    }

    pub fn jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.config.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    pub fn build(self) -> RetryConfig {
        self.config
    }
}

//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further one.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `retry` (1-based).
    fn delay_before_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success { value: T, attempts: u32 },
    /// Every attempt failed; `error` is the last one.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { attempts, .. } | RetryResult::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success { value, .. } => Ok(value),
            RetryResult::Failed { error, .. } => Err(error),
        }
    }
}

/// Run `operation` until it succeeds or `max_retries` retries are spent.
/// The closure receives the 1-based attempt number.
pub async fn retry_async<F, Fut, T, E>(config: &RetryConfig, operation: F) -> RetryResult<T, E>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1u32;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) if attempt <= config.max_retries => {
                let delay = config.delay_before_retry(attempt);
                warn!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, attempt, delay, e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!("{} gave up after {} attempts", config.operation_name, attempt);
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt,
                };
            }
        }
    }
}

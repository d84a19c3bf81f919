use crate::Result;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    max_retries: u32,
    initial_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// `max_retries` counts attempts in total; zero still makes one attempt.
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self { max_retries, initial_delay }
    }

    /// A single attempt with no backoff.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// the attempts run out. The delay doubles after each failure.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_retries.max(1);
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempts += 1;
                if !e.is_transient() || attempts >= max_attempts {
                    return Err(e);
                }
                warn!(attempt = attempts, error = %e, "content store call failed, retrying");
                sleep(config.initial_delay.saturating_mul(2u32.saturating_pow(attempts))).await;
            }
        }
    }
}

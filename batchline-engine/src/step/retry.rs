//! Bounded retry around a step's item processing

use batchline_core::{BatchError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::{RetryPredicate, StepSettings};

/// Retry rules for one step
///
/// An attempt is repeated only while attempts remain, the error is a
/// pipeline stage error, and the predicate accepts it. Each retry reruns
/// the whole operation from scratch.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
    predicate: RetryPredicate,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration, predicate: RetryPredicate) -> Self {
        Self {
            max_retries,
            delay,
            predicate,
        }
    }

    pub fn from_settings(settings: &StepSettings) -> Self {
        Self::new(
            settings.max_retries,
            settings.retry_delay,
            settings.retry_predicate.clone(),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn should_retry(&self, error: &BatchError) -> bool {
        error.is_retryable() && (self.predicate)(error)
    }

    /// Runs `operation` until it succeeds or the error becomes terminal
    ///
    /// The sleep between attempts only suspends the calling task.
    pub async fn run<F, Fut>(&self, step_name: &str, mut operation: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut retry_count = 0;
        loop {
            match operation().await {
                Ok(()) => return Ok(()),
                Err(error) if retry_count < self.max_retries && self.should_retry(&error) => {
                    retry_count += 1;
                    warn!(
                        "Error occurred while executing step {}: {}. Retrying in {:?} ({}/{})",
                        step_name, error, self.delay, retry_count, self.max_retries
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

//! Retry policy for storage operations.
//!
//! Implements bounded exponential backoff. Only [`StorageError::Transient`]
//! triggers a retry, every other error goes straight back to the caller.

use crate::config::{RetrySettings, MAX_BACKOFF_SECS};
use crate::error::{StorageError, StorageResult};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Performs the wait between two attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Retry policy implementing exponential backoff.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    /// Wait before the second attempt, in seconds.
    pub initial_backoff_secs: f64,
    /// Maximum wait between two attempts, in seconds.
    pub max_backoff_secs: f64,
    /// Multiplier applied to the wait after each retry.
    pub backoff_multiplier: f64,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff_secs", &self.initial_backoff_secs)
            .field("max_backoff_secs", &self.max_backoff_secs)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .finish()
    }
}

impl RetryPolicy {
    /// Create a new RetryPolicy from configuration settings.
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_backoff_secs: settings.initial_backoff_secs,
            max_backoff_secs: settings.max_backoff_secs,
            backoff_multiplier: settings.backoff_multiplier,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replaces the component that performs the actual waiting.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Wait applied after the `retry_index`-th failed attempt (0 based):
    /// `initial_backoff * multiplier^retry_index`, capped at `max_backoff_secs`
    /// and never above [`MAX_BACKOFF_SECS`]. NaN settings fall back to the cap.
    pub fn backoff(&self, retry_index: u32) -> Duration {
        let exponent = i32::try_from(retry_index).unwrap_or(i32::MAX);
        let backoff = self.initial_backoff_secs * self.backoff_multiplier.powi(exponent);
        let secs = backoff
            .min(self.max_backoff_secs)
            .min(MAX_BACKOFF_SECS)
            .max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::from_secs(MAX_BACKOFF_SECS as u64))
    }

    /// Runs `operation`, retrying it on transient failures.
    ///
    /// `label` only shows up in logs. After the last attempt the last
    /// transient error is returned as is.
    pub fn execute<T, F>(&self, label: &str, mut operation: F) -> StorageResult<T>
    where
        F: FnMut() -> StorageResult<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err @ StorageError::Transient(_)) if attempt < max_attempts => {
                    let wait = self.backoff(attempt - 1);
                    warn!(
                        "{} failed on attempt {}/{}: {}. Retrying in {:?}",
                        label, attempt, max_attempts, err, wait
                    );
                    self.sleeper.sleep(wait);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}

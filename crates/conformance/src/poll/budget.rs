//! Retry budget for the fetch loop

use std::time::Duration;
use thiserror::Error;

/// Rejected retry budget
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryBudgetError {
    #[error("RetryCount must be at least 1")]
    ZeroAttempts,
}

/// Inter-attempt delay and maximum attempt count.
///
/// Read once from the `WaitTime` (milliseconds) and `RetryCount` properties.
/// A zero delay is allowed; a zero attempt count is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    wait: Duration,
    max_attempts: u32,
}

impl RetryBudget {
    pub fn new(wait: Duration, max_attempts: u32) -> Result<Self, RetryBudgetError> {
        if max_attempts == 0 {
            return Err(RetryBudgetError::ZeroAttempts);
        }
        Ok(Self { wait, max_attempts })
    }

    pub fn from_millis(wait_ms: u64, max_attempts: u32) -> Result<Self, RetryBudgetError> {
        Self::new(Duration::from_millis(wait_ms), max_attempts)
    }

    /// Delay slept before every attempt
    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

//! Bounded retry for flaky remote-shell operations.
//!
//! The one place in the engine with built-in retry. The policy is an explicit
//! value threaded through the handler, and retry exhaustion is a first-class
//! terminal outcome rather than a caught exception.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Explicit retry policy: attempt budget plus capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1000,
            backoff_max_ms: 60000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given attempt (1-based; the first attempt has none)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(2).min(16);
        let ms = self
            .backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }
}

/// Failure of one shell attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// Worth another attempt (connection reset, transient remote hiccup)
    Transient(String),
    /// Retrying cannot help (bad command, permission denied)
    Fatal(String),
}

/// Terminal result of a retried shell operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutcome {
    Completed(String),
    /// Attempt budget spent on transient errors
    Exhausted { attempts: u32, last_error: String },
    Fatal(String),
}

/// Drive an operation to a terminal outcome under the given policy.
///
/// The operation receives the 1-based attempt number.
pub async fn run_with_retry<F, Fut>(policy: RetryPolicy, mut op: F) -> ShellOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<String, ShellError>>,
{
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts.max(1) {
        let backoff = policy.backoff_for(attempt);
        if !backoff.is_zero() {
            tokio::time::sleep(backoff).await;
        }

        match op(attempt).await {
            Ok(output) => {
                debug!(attempt, "shell operation completed");
                return ShellOutcome::Completed(output);
            }
            Err(ShellError::Fatal(message)) => {
                warn!(attempt, %message, "shell operation failed fatally");
                return ShellOutcome::Fatal(message);
            }
            Err(ShellError::Transient(message)) => {
                warn!(attempt, %message, "transient shell failure, will retry if budget remains");
                last_error = message;
            }
        }
    }

    ShellOutcome::Exhausted {
        attempts: policy.max_attempts.max(1),
        last_error,
    }
}

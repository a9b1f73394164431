//! Bounded retry with a fixed delay for transport operations
//!
//! A transient failure waits `delay` and tries again, at most `retries`
//! times. Permanent failures are returned immediately.

use std::time::Duration;

use backoff::backoff::Backoff;

use crate::transfer::TransportError;

/// Retry policy applied to every remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub retries: u32,
    /// Wait before each extra attempt
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without waiting.
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            delay: Duration::ZERO,
        }
    }

    /// Run `op`, retrying transient failures according to the policy.
    ///
    /// `what` only labels log lines.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let schedule = FixedRetry::new(self.retries, self.delay);

        let attempt = || {
            op().map_err(|e| {
                if e.is_transient() {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        };

        let notify = |err: TransportError, wait: Duration| {
            tracing::warn!(
                target_path = what,
                error = %err,
                wait_secs = wait.as_secs(),
                "transport failed, retrying"
            );
        };

        backoff::retry_notify(schedule, attempt, notify).map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

/// Constant delay, limited number of retries.
#[derive(Debug, Clone)]
struct FixedRetry {
    delay: Duration,
    budget: u32,
    remaining: u32,
}

impl FixedRetry {
    fn new(budget: u32, delay: Duration) -> Self {
        Self {
            delay,
            budget,
            remaining: budget,
        }
    }
}

impl Backoff for FixedRetry {
    fn reset(&mut self) {
        self.remaining = self.budget;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

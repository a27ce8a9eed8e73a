//! Bounded retry with exponential backoff for transient QBench failures.
//!
//! Every logical request runs through [`RetryPolicy::run`]. An attempt
//! reports [`Attempt::Retry`] for throttling, 5xx responses, timeouts and
//! rejected tokens; everything else ends the loop immediately.

use std::future::Future;
use std::time::Duration;

use psq_config::QBenchConfig;

use crate::error::QBenchError;

/// Outcome of one attempt.
#[derive(Debug)]
pub(crate) enum Attempt<R> {
    Done(R),
    Fatal(QBenchError),
    Retry {
        reason: String,
        /// Server-provided wait, already padded.
        hint: Option<Duration>,
        /// The bearer token was rejected; exhausting the budget on this
        /// reason surfaces as an authentication failure.
        unauthorized: bool,
    },
}

impl<R> Attempt<R> {
    pub(crate) fn retry(reason: impl Into<String>) -> Self {
        Self::Retry {
            reason: reason.into(),
            hint: None,
            unauthorized: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff and hints are capped here).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl From<&QBenchConfig> for RetryPolicy {
    fn from(config: &QBenchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based).
    ///
    /// Doubles from `base_delay`; a server hint replaces the backoff when it
    /// is longer. Both are capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1 << exponent);
        hint.map_or(backoff, |h| h.max(backoff)).min(self.max_delay)
    }

    /// Drive `attempt` until it succeeds, fails fatally, or the budget runs out.
    pub(crate) async fn run<R, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<R, QBenchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<R>>,
    {
        let mut n = 0;
        loop {
            n += 1;
            match attempt(n).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retry {
                    reason,
                    hint,
                    unauthorized,
                } => {
                    if n >= self.max_attempts {
                        return Err(if unauthorized {
                            QBenchError::Authentication(format!(
                                "{operation}: token rejected after {n} attempt(s)"
                            ))
                        } else {
                            QBenchError::Transient(format!(
                                "{operation} failed after {n} attempt(s): {reason}"
                            ))
                        });
                    }
                    let delay = self.delay_for(n, hint);
                    tracing::warn!(
                        operation,
                        attempt = n,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %reason,
                        "transient QBench failure, retrying",
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

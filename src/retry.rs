//! Bounded retry with uniform failure classification.
//!
//! [`RetryExecutor`] is the single place where transient flakiness of the form
//! surface is absorbed. Retriable failures are retried with a paced backoff
//! until the attempt budget runs out; terminal failures abort immediately.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FailureKind, OperationError, StageFailure};
use crate::pacing::PacingPolicy;

const MAX_BACKOFF_FACTOR: u32 = 8;

/// Retry budget and backoff envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_min_secs")]
    pub backoff_min_secs: f64,
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_min_secs() -> f64 {
    1.0
}

fn default_backoff_max_secs() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_min_secs: default_backoff_min_secs(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff bounds after the given failed attempt:
    /// `[min, max] * 2^(attempt - 1)`, factor capped at 8.
    pub fn backoff_for_attempt(&self, attempt: u32) -> (f64, f64) {
        let factor = 2u32
            .saturating_pow(attempt.saturating_sub(1))
            .min(MAX_BACKOFF_FACTOR) as f64;
        (self.backoff_min_secs * factor, self.backoff_max_secs * factor)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Wait within the given bounds, then try again.
    Retry { lower_secs: f64, upper_secs: f64 },
    /// Stop and surface the failure.
    GiveUp(StageFailure),
}

/// Attempt bookkeeping for one named operation.
///
/// Used directly by callers that need to observe every attempt (the expand
/// sub-machine records a state transition per attempt); everything else goes
/// through [`RetryExecutor::run`].
#[derive(Debug)]
pub struct Attempts {
    operation: String,
    policy: RetryPolicy,
    made: u32,
}

impl Attempts {
    pub fn made(&self) -> u32 {
        self.made
    }

    pub fn begin(&mut self) -> u32 {
        self.made += 1;
        self.made
    }

    pub fn record_failure(&self, cause: OperationError) -> RetryDecision {
        let kind = cause.kind();
        if kind == FailureKind::Terminal || self.made >= self.policy.attempts() {
            return RetryDecision::GiveUp(StageFailure {
                operation: self.operation.clone(),
                attempts: self.made,
                kind,
                cause,
            });
        }
        let (lower_secs, upper_secs) = self.policy.backoff_for_attempt(self.made);
        RetryDecision::Retry {
            lower_secs,
            upper_secs,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    pacing: PacingPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, pacing: PacingPolicy) -> Self {
        Self { policy, pacing }
    }

    pub fn pacing(&self) -> &PacingPolicy {
        &self.pacing
    }

    pub fn attempts(&self, operation: impl Into<String>) -> Attempts {
        Attempts {
            operation: operation.into(),
            policy: self.policy,
            made: 0,
        }
    }

    /// Waits out a retry decision's backoff.
    pub async fn back_off(&self, lower_secs: f64, upper_secs: f64) {
        self.pacing.delay(lower_secs, upper_secs).await;
    }

    /// Invokes `operation` until it succeeds, fails terminally, or the attempt
    /// budget is exhausted.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, StageFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let mut attempts = self.attempts(operation);
        loop {
            let attempt = attempts.begin();
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(cause) => match attempts.record_failure(cause.clone()) {
                    RetryDecision::Retry {
                        lower_secs,
                        upper_secs,
                    } => {
                        warn!(
                            operation,
                            attempt,
                            max = self.policy.attempts(),
                            %cause,
                            "retrying after transient failure"
                        );
                        self.back_off(lower_secs, upper_secs).await;
                    }
                    RetryDecision::GiveUp(failure) => return Err(failure),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ResolveError, SurfaceError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn executor(max_attempts: u32) -> RetryExecutor {
        RetryExecutor::new(
            RetryPolicy {
                max_attempts,
                ..Default::default()
            },
            PacingPolicy::immediate(),
        )
    }

    fn not_ready() -> OperationError {
        SurfaceError::NotReady("stale element".into()).into()
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff_min_secs: 1.0,
            backoff_max_secs: 2.0,
        };
        assert_eq!(policy.backoff_for_attempt(1), (1.0, 2.0));
        assert_eq!(policy.backoff_for_attempt(2), (2.0, 4.0));
        assert_eq!(policy.backoff_for_attempt(3), (4.0, 8.0));
        assert_eq!(policy.backoff_for_attempt(4), (8.0, 16.0));
        assert_eq!(policy.backoff_for_attempt(9), (8.0, 16.0));
    }

    #[test]
    fn zero_attempts_is_treated_as_one() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(policy.attempts(), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = executor(3)
            .run("set mrp", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(not_ready())
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_carries_last_cause() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let failure = executor(2)
            .run("select color", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(OperationError::from(SurfaceError::NotReady(format!(
                    "attempt {n}"
                ))))
            })
            .await
            .unwrap_err();
        assert_eq!(failure.operation, "select color");
        assert_eq!(failure.attempts, 2);
        assert_eq!(failure.kind, FailureKind::Retriable);
        assert_eq!(
            failure.cause,
            OperationError::Surface(SurfaceError::NotReady("attempt 1".into()))
        );
    }

    #[tokio::test]
    async fn terminal_failure_aborts_without_spending_attempts() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let failure = executor(5)
            .run("select gemstone", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(OperationError::from(ResolveError::EmptyOptions))
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(failure.attempts, 1);
        assert_eq!(failure.kind, FailureKind::Terminal);
    }

    #[test]
    fn attempts_decide_retry_until_budget_is_spent() {
        let exec = executor(2);
        let mut attempts = exec.attempts("expand");
        attempts.begin();
        assert!(matches!(
            attempts.record_failure(not_ready()),
            RetryDecision::Retry { .. }
        ));
        attempts.begin();
        assert!(matches!(
            attempts.record_failure(not_ready()),
            RetryDecision::GiveUp(_)
        ));
        assert_eq!(attempts.made(), 2);
    }
}

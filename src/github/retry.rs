//! Backoff for transient GitHub failures.
//!
//! The interpreter only asks for retries on idempotent effects. Everything
//! that is not `Transient` (missing resources, conflicts, permanent errors)
//! comes straight back to the caller.

use std::future::Future;
use std::time::Duration;

use super::error::GitHubApiError;

/// Doubling backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Wait before the first retry; each later wait doubles.
    pub initial_delay: Duration,
}

impl RetryConfig {
    /// 3 retries after 2s, 4s and 8s.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
    };

    /// The wait before retry number `retry` (0-indexed).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        self.initial_delay.saturating_mul(1u32 << retry.min(16))
    }
}

/// Whether transient failures are retried at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    #[default]
    RetryTransient,

    /// Used for mutations, and for every call under `--no-retry`.
    NoRetry,
}

/// How a retried call ended.
#[derive(Debug)]
pub enum RetryResult<T> {
    Success(T),

    /// Still transient after the last permitted attempt.
    ExhaustedRetries {
        last_error: GitHubApiError,
        attempts: u32,
    },

    /// A non-transient error; never retried.
    Failed(GitHubApiError),
}

impl<T> RetryResult<T> {
    pub fn into_result(self) -> Result<T, GitHubApiError> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::ExhaustedRetries {
                last_error,
                attempts,
            } => {
                if attempts > 1 {
                    tracing::warn!(attempts, error = %last_error, "Giving up after transient failures");
                }
                Err(last_error)
            }
            RetryResult::Failed(e) => Err(e),
        }
    }
}

/// Runs `operation` until it succeeds, fails non-transiently, or the
/// schedule in `config` runs out.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    policy: RetryPolicy,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let retries = match policy {
        RetryPolicy::RetryTransient => config.max_retries,
        RetryPolicy::NoRetry => 0,
    };

    let mut attempts = 0;
    loop {
        attempts += 1;
        let error = match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if !e.kind.is_retriable() => return RetryResult::Failed(e),
            Err(e) => e,
        };
        if attempts > retries {
            return RetryResult::ExhaustedRetries {
                last_error: error,
                attempts,
            };
        }

        let delay = config.delay_for_attempt(attempts - 1);
        tracing::debug!(attempts, ?delay, error = %error, "Transient failure, backing off");
        tokio::time::sleep(delay).await;
    }
}

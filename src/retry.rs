//! Retry logic with linear backoff
//!
//! Each URL candidate gets a fixed number of tries. The wait before retry `n` is
//! `delay_step * n`, optionally jittered, so a flaky candidate is given a short
//! breather before the next fallback is tried.
//!
//! # Example
//!
//! ```no_run
//! use illust_dl::retry::{IsRetryable, RetryPolicy, download_with_retry};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let policy = RetryPolicy::default();
//! download_with_retry(&policy, |_attempt| async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::{Config, RetryConfig};
use crate::error::{DownloadError, ResolveError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (a failed fetch, a connection reset) should return `true`.
/// Permanent failures (a rejected path, a missing subject) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for DownloadError {
    fn is_retryable(&self) -> bool {
        match self {
            DownloadError::AssetFetchFailed { .. } => true,
            // Path rejections are handled by moving to the next path, not by retrying
            DownloadError::PathRejected { .. } => false,
            DownloadError::CommitFailed { .. } => false,
            DownloadError::Exhausted { .. } => false,
        }
    }
}

impl IsRetryable for ResolveError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Effective retry settings for one URL candidate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one
    pub max_attempts: u32,
    /// Base delay step
    pub delay_step: Duration,
    /// Add random jitter to delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_retry_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Policy from the retry section alone
    pub fn from_retry_config(retry: &RetryConfig) -> Self {
        Self {
            max_attempts: retry.max_attempts.max(1),
            delay_step: retry.delay_step,
            jitter: retry.jitter,
        }
    }

    /// Policy honoring the global retry switch; a disabled switch means one try
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.attempts_per_candidate().max(1),
            ..Self::from_retry_config(&config.retry)
        }
    }

    /// Delay before retry `attempt` (1-based), without jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_step.saturating_mul(attempt)
    }
}

/// Execute an async operation, retrying retryable failures with linear backoff
///
/// The operation receives the 1-based attempt number. Returns the first success, the
/// first non-retryable error, or the last error once `max_attempts` tries are used up.
pub async fn download_with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                let delay = if policy.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

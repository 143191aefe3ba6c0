use std::future::Future;

use anyhow::{anyhow, Result};
use log::{debug, error};
use tokio::time::{sleep, timeout, Duration};

/// Attempts, backoff and per-attempt deadline for one RPC call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            attempt_timeout: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling from the initial backoff.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .checked_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Retry with the default policy.
pub async fn retry<F, Fut, T>(f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with(&RetryPolicy::default(), f).await
}

/// Run `f` until it succeeds or the policy's attempts run out.
/// The last error is returned as is.
pub async fn retry_with<F, Fut, T>(policy: &RetryPolicy, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);

    for attempt in 0..attempts {
        let last = attempt + 1 == attempts;

        let failure = match timeout(policy.attempt_timeout, f()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => anyhow!("Timed out after {:?}", policy.attempt_timeout),
        };

        if last {
            error!("Giving up after {} attempts: {:?}", attempts, failure);
            return Err(failure);
        }

        let delay = policy.backoff(attempt);
        debug!("Attempt {} failed ({}), retrying after {:?}", attempt + 1, failure, delay);
        sleep(delay).await;
    }

    Err(anyhow!("No attempts were made"))
}

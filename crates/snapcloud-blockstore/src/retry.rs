use std::future::Future;
use std::time::Duration;

use crate::Result;

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

/// Bounded retry of transient block store failures, with exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,

    /// Delay before the first retry. Doubles on every following one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Wait before retry number `attempt + 1`. Saturates instead of overflowing.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff
            .checked_mul(2_u32.saturating_pow(attempt))
            .unwrap_or(Duration::MAX)
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    let delay = self.delay(attempt);
                    tracing::warn!(attempt = attempt + 1, delay = ?delay, "retrying after transient error: {}", e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

//! Bounded retry with jittered exponential backoff for model calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::LlmError;

/// Retry policy for transient LLM transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), with jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1 << attempt.min(16));
        let capped = exp.min(self.max_delay);
        let jitter_ms = rand::rng().random_range(0..=capped.as_millis() as u64 / 2);
        capped + Duration::from_millis(jitter_ms)
    }
}

/// Runs `operation`, retrying transient failures up to the policy's limit.
///
/// Non-transient errors (authentication, parse failures) return
/// immediately; exhaustion surfaces the last transient error to the caller,
/// which converts it into an agent-level fault.
pub async fn with_retries<T, F, Fut>(
    policy: RetryPolicy,
    op_name: &str,
    mut operation: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation = op_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient LLM failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

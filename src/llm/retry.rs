//! Bounded retry with linear backoff for backends that report temporary
//! unavailability (HTTP 503 while a model is loading).

use std::future::Future;
use std::time::Duration;

use opentelemetry::KeyValue;

use crate::error::ProviderError;
use crate::telemetry::metrics::GEN_AI_RETRY_COUNT;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following the 0-indexed `attempt`.
    /// Saturates at `Duration::MAX`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .checked_mul(attempt.saturating_add(1))
            .unwrap_or(Duration::MAX)
    }

    /// Total sleep time when the first `failures` attempts are unavailable.
    pub fn total_delay(&self, failures: u32) -> Duration {
        (0..failures).fold(Duration::ZERO, |total, a| {
            total.saturating_add(self.delay_after(a))
        })
    }
}

/// Runs `op` until it succeeds or returns something other than
/// [`ProviderError::TransientUnavailable`].
///
/// Unavailability on the final attempt becomes
/// [`ProviderError::RetriesExhausted`]. Timeouts and other failures are
/// returned as-is without retrying.
pub async fn retry_unavailable<T, F, Fut>(
    policy: &RetryPolicy,
    provider_name: &str,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    for attempt in 0..policy.max_attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                if attempt + 1 >= policy.max_attempts {
                    break;
                }
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    provider = provider_name,
                    wait_ms = delay.as_millis() as u64,
                    error = %err,
                    "Model loading, waiting before retry"
                );
                GEN_AI_RETRY_COUNT.add(
                    1,
                    &[KeyValue::new("gen_ai.provider.name", provider_name.to_string())],
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }

    Err(ProviderError::RetriesExhausted {
        attempts: policy.max_attempts,
    })
}

//! Backoff for action side effects that fail transiently.

use std::future::Future;
use std::time::Duration;

use crate::error::GateError;

/// How often, and how patiently, a failing action is tried again.
///
/// The delay before retry `n` (zero-based) is
/// `initial_backoff * multiplier^n`, capped at `max_backoff`, then scaled by
/// a jitter factor in `[0.75, 1.25)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Growth factor between delays; at least 1.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 7.0,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Reject settings that cannot produce a sane delay.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(format!(
                "multiplier must be a finite number >= 1, got {}",
                self.multiplier
            ));
        }
        if self.max_backoff < self.initial_backoff {
            return Err("max_backoff must not be shorter than initial_backoff".into());
        }
        Ok(())
    }

    /// Un-jittered delay before retry `retry` (zero-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `operation`, retrying errors for which
    /// [`GateError::is_retryable`] holds.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, GateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GateError>>,
    {
        self.run(None, operation).await
    }

    /// [`execute`](Self::execute) for one action run, logged under the
    /// action name and token.
    pub async fn execute_for<F, Fut, T>(
        &self,
        action: &str,
        token: &str,
        operation: F,
    ) -> Result<T, GateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GateError>>,
    {
        self.run(Some((action, token)), operation).await
    }

    async fn run<F, Fut, T>(&self, scope: Option<(&str, &str)>, mut operation: F) -> Result<T, GateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GateError>>,
    {
        let (action, token) = scope.unwrap_or(("-", "-"));
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= max_attempts {
                if attempt > 1 {
                    tracing::warn!(action, token, attempts = attempt, error = %err, "action gave up");
                }
                return Err(err);
            }

            let delay = jittered(self.backoff(attempt - 1));
            tracing::warn!(
                action,
                token,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "action failed transiently, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Scale `delay` by a random factor in `[0.75, 1.25)`.
fn jittered(delay: Duration) -> Duration {
    let bits = uuid::Uuid::new_v4().as_u128() as u64;
    let factor = 0.75 + (bits % 10_000) as f64 / 20_000.0;
    delay.mul_f64(factor)
}

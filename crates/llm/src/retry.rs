//! Bounded exponential backoff for calls to the extraction service.

use std::future::Future;
use std::time::Duration;

use leadflow_core::PipelineSettings;
use rand::Rng as _;
use tokio::time::Instant;

use crate::error::LlmError;

/// Retry schedule: `max_retries` retries after the first attempt, delays of
/// `base_delay * 2^(n-1)` capped at `max_delay`, and no retry once the total
/// elapsed time would pass `max_elapsed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_elapsed: Duration,
    /// Randomize each delay within `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            max_retries: settings.extraction_max_retries,
            base_delay: settings.extraction_base_delay,
            max_delay: settings.extraction_max_delay,
            max_elapsed: settings.extraction_max_elapsed,
            jitter: true,
        }
    }

    /// Retries without waiting; for tests and local tooling.
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_elapsed: Duration::from_secs(60),
            jitter: false,
        }
    }

    /// Un-jittered delay before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 1_u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(millis / 2..=millis))
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// `op` receives the zero-based attempt number.
    ///
    /// # Errors
    /// Returns the first non-transient error unchanged, `RetriesExhausted`
    /// after the last attempt, or `DeadlineExceeded` when the next wait
    /// would pass `max_elapsed`.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let started = Instant::now();
        let mut attempt = 0_u32;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_retries {
                return Err(LlmError::RetriesExhausted {
                    attempts: attempt.saturating_add(1),
                    last: Box::new(err),
                });
            }
            attempt = attempt.saturating_add(1);

            let delay = self.jittered(self.backoff_delay(attempt));
            if started.elapsed().saturating_add(delay) > self.max_elapsed {
                return Err(LlmError::DeadlineExceeded {
                    budget: self.max_elapsed,
                    last: Box::new(err),
                });
            }
            tracing::warn!(
                operation = label,
                attempt,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
            max_elapsed: Duration::from_secs(45),
            jitter: false,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(p.backoff_delay(3), Duration::from_millis(3000));
        assert_eq!(p.backoff_delay(40), Duration::from_millis(3000));
    }

    #[test]
    fn jitter_stays_within_half_to_full_delay() {
        let p = RetryPolicy { jitter: true, ..policy() };
        for _ in 0..50 {
            let d = p.jittered(Duration::from_millis(1000));
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), LlmError> = policy()
            .run("test", |_| {
                calls += 1;
                async { Err(LlmError::HttpStatus { code: 400, body: String::new() }) }
            })
            .await;
        assert!(matches!(result, Err(LlmError::HttpStatus { code: 400, .. })));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_exhaust_after_four_attempts() {
        let mut calls = 0;
        let result: Result<(), LlmError> = policy()
            .run("test", |_| {
                calls += 1;
                async { Err(LlmError::HttpStatus { code: 503, body: String::new() }) }
            })
            .await;
        assert!(matches!(result, Err(LlmError::RetriesExhausted { attempts: 4, .. })));
        assert_eq!(calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_budget_stops_retrying() {
        let p = RetryPolicy { max_retries: 10, max_elapsed: Duration::from_millis(2500), ..policy() };
        let mut calls = 0;
        let result: Result<(), LlmError> = p
            .run("test", |_| {
                calls += 1;
                async { Err(LlmError::HttpStatus { code: 429, body: String::new() }) }
            })
            .await;
        // waits 1s then 2s would reach 3s > 2.5s
        assert!(matches!(result, Err(LlmError::DeadlineExceeded { .. })));
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let result = policy()
            .run("test", |attempt| async move {
                if attempt < 2 {
                    Err(LlmError::HttpStatus { code: 502, body: String::new() })
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 2);
    }
}

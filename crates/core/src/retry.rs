//! Generic retry combinator with a pluggable delay policy and error
//! classifier.
//!
//! Shared by every persistence call site and by the image generator client.
//! Only errors the classifier marks as retryable are retried; anything else
//! is returned immediately.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Default attempts for persistence writes.
pub const DEFAULT_PERSIST_ATTEMPTS: u32 = 3;

/// Default fixed delay between persistence attempts.
pub const DEFAULT_PERSIST_DELAY: Duration = Duration::from_millis(500);

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// The same delay after every failed attempt.
    Fixed(Duration),
    /// `initial * multiplier^(n-1)`, clamped to `max`.
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                initial,
                max,
                multiplier: 2.0,
            },
        }
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exp = attempt.saturating_sub(1).min(31) as i32;
                let ms = initial.as_millis() as f64 * multiplier.powi(exp);
                Duration::from_millis(ms.min(max.as_millis() as f64) as u64)
            }
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_PERSIST_ATTEMPTS, DEFAULT_PERSIST_DELAY)
    }
}

/// Run `op` until it succeeds, the classifier rejects an error, or the
/// attempt budget is spent.
///
/// `op` receives the 1-based attempt number. `operation` names the call in
/// log lines.
pub async fn retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: C,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: Display,
{
    let max = policy.attempts();
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max && is_retryable(&e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = max,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable failure, retrying",
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::error!(operation, attempt, error = %e, "Giving up after retries");
                }
                return Err(e);
            }
        }
    }
}

//! Backoff helper for connectors.
//!
//! The runner never retries: a failed fetch, store or savepoint write is
//! fatal to the run. Connectors that want to absorb transient failures wrap
//! their own I/O in a [`RetryPolicy`] built from the pipeline's advisory
//! `max_retries`.

use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::warn;

/// Whether a failed attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

#[derive(Debug)]
pub enum RetryError<E> {
    /// Classified as non-transient; returned after the first occurrence.
    Fatal(E),
    /// Still failing after every allowed attempt.
    AttemptsExceeded { attempts: usize, last: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::AttemptsExceeded { last, .. } => last,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// `max_retries` counts repeats, so a value of 0 still makes one attempt.
    pub fn with_retries(max_retries: u32, base_delay: Duration) -> Self {
        Self::new(
            max_retries as usize + 1,
            base_delay,
            Self::default().max_delay,
        )
    }

    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub async fn run<F, Fut, T, E, C>(&self, mut op: F, classify: C) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDisposition,
        E: std::fmt::Display,
    {
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if classify(&err) == RetryDisposition::Stop {
                return Err(RetryError::Fatal(err));
            }
            if attempt >= self.max_attempts {
                return Err(RetryError::AttemptsExceeded {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.backoff_delay(attempt - 1);
            warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
            sleep(delay).await;
        }
    }

    fn backoff_delay(&self, retry: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let factor = 1u32 << retry.min(6);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

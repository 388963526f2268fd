//! Bounded retry with exponential backoff for external calls.
//!
//! Errors are classified by the caller through [`Classify`]. Only
//! `Retryable` failures are retried; a `Fatal` failure returns immediately.
//! With the default policy a persistently failing call is attempted three
//! times, sleeping 1s and then 2s between attempts.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Whether a failure is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Fatal,
}

pub trait Classify {
    fn classify(&self) -> ErrorClass;

    fn is_retryable(&self) -> bool {
        self.classify() == ErrorClass::Retryable
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    /// Fraction of each backoff added or removed at random. Zero disables jitter.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff to sleep after the given (1-indexed) failed attempt, before jitter.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.initial_backoff
            .mul_f64(self.multiplier.max(1.0).powi(exponent))
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter_factor <= 0.0 {
            return base;
        }
        let factor = self.jitter_factor.min(1.0);
        let scale = rand::thread_rng().gen_range((1.0 - factor)..=(1.0 + factor));
        base.mul_f64(scale)
    }
}

/// Why a retried call gave up.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// A non-retryable failure on the given attempt.
    Fatal { attempt: u32, error: E },
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Fatal { attempt, error } => {
                write!(f, "non-retryable failure on attempt {}: {}", attempt, error)
            }
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {} attempts: {}", attempts, last)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Run `operation` until it succeeds, fails fatally, or the policy is exhausted.
///
/// The error type classifies itself through [`Classify`].
pub async fn call_with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display,
{
    call_with_retry_classified(policy, operation, |e: &E| e.classify()).await
}

/// Like [`call_with_retry`] with an explicit classifier.
///
/// `operation` receives the 1-indexed attempt number. No sleep follows the
/// final attempt.
pub async fn call_with_retry_classified<F, Fut, T, E, C>(
    policy: &RetryPolicy,
    mut operation: F,
    classify: C,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    C: Fn(&E) -> ErrorClass,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if classify(&error) == ErrorClass::Fatal => {
                tracing::warn!(attempt, error = %error, "Non-retryable failure");
                return Err(RetryError::Fatal { attempt, error });
            }
            Err(error) if attempt >= max_attempts => {
                tracing::warn!(attempts = attempt, error = %error, "Retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }
            Err(error) => {
                let delay = policy.jittered(policy.backoff_after(attempt));
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retryable failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Flaky,
        Broken,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Classify for TestError {
        fn classify(&self) -> ErrorClass {
            match self {
                TestError::Flaky => ErrorClass::Retryable,
                TestError::Broken => ErrorClass::Fatal,
            }
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_after(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_after(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_stays_within_factor() {
        let policy = RetryPolicy {
            jitter_factor: 0.25,
            ..Default::default()
        };
        for _ in 0..100 {
            let d = policy.jittered(Duration::from_secs(4));
            assert!(d >= Duration::from_secs(3) && d <= Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_retryable_failure_makes_three_calls() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = calls.clone();
        let result: Result<(), _> = call_with_retry(&RetryPolicy::default(), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Flaky)
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 3,
                last: TestError::Flaky
            })
        );
        // 1s + 2s of backoff, nothing after the last attempt
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = calls.clone();
        let result: Result<(), _> = call_with_retry(&RetryPolicy::default(), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Broken)
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Fatal { attempt: 1, .. })));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_third_attempt_after_three_seconds() {
        let start = Instant::now();
        let result = call_with_retry(&RetryPolicy::default(), |attempt| async move {
            if attempt < 3 {
                Err(TestError::Flaky)
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_classifier_overrides_error_class() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = call_with_retry_classified(
            &RetryPolicy::default(),
            |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Flaky)
                }
            },
            |_| ErrorClass::Fatal,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Fatal { attempt: 1, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_calls_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        let result: Result<(), _> = call_with_retry(&policy, |_| async { Err(TestError::Flaky) }).await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
    }
}

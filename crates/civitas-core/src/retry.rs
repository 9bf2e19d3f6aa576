//! Bounded retry for LLM calls

use crate::error::Result;
use std::time::Duration;

/// Outcome of a retried operation together with the attempts it took
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The final result after the last attempt
    pub result: Result<T>,
    /// Attempts performed beyond the first call
    pub retries: u32,
}

/// Run `operation` up to `max_attempts` times, retrying transient failures
/// with exponential backoff (100ms base, doubling per attempt).
///
/// Non-retryable errors (budget exhaustion, document errors) abort
/// immediately. The attempt count is returned alongside the result so the
/// caller can attribute retries to the parent interview's stats.
pub async fn with_retries<F, Fut, T>(max_attempts: u32, operation: F) -> RetryOutcome<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = Duration::from_millis(100);
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    retries,
                }
            }
            Err(e) => {
                let attempt = retries + 1;
                if attempt >= max_attempts || !e.is_retryable() {
                    return RetryOutcome {
                        result: Err(e),
                        retries,
                    };
                }
                tokio::time::sleep(delay).await;
                delay *= 2;
                retries += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_succeeds_first_try_without_retrying() {
        let calls = AtomicU32::new(0);
        let outcome = with_retries(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.retries, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures_until_success() {
        let calls = AtomicU32::new(0);
        let outcome = with_retries(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::llm("connection reset"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(outcome.result.unwrap(), "done");
        assert_eq!(outcome.retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausting_attempts_returns_last_error() {
        let calls = AtomicU32::new(0);
        let outcome = with_retries(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::schema("missing field")) }
        })
        .await;
        assert!(matches!(outcome.result, Err(Error::SchemaValidation(_))));
        assert_eq!(outcome.retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_abort_immediately() {
        let calls = AtomicU32::new(0);
        let outcome = with_retries(5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(Error::BudgetExceeded {
                    spent_usd: 1.0,
                    limit_usd: 1.0,
                })
            }
        })
        .await;
        assert!(outcome.result.is_err());
        assert_eq!(outcome.retries, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Retry executor for store operations.

use std::time::Duration;

use thiserror::Error;

use crate::{LogRecord, Store, StoreError};

/// Retry behavior for a single store operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles after each retry.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }
}

/// Failure of a retried store operation.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The operation failed with a non-retryable error; propagated unchanged.
    #[error(transparent)]
    Fatal(StoreError),

    /// A retryable error persisted through every allowed attempt.
    #[error("store operation failed after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: StoreError },
}

impl RetryError {
    /// The underlying store error, whichever way the retry ended.
    pub fn store_error(&self) -> &StoreError {
        match self {
            RetryError::Fatal(err) => err,
            RetryError::Exhausted { source, .. } => source,
        }
    }
}

/// Execute a statement on `conn`, retrying transient failures.
///
/// Runs the statement up to `policy.max_attempts` times. A retryable error
/// (see [`StoreError::is_retryable`]) triggers a backoff sleep that starts
/// at `policy.initial_delay` and doubles per attempt; no jitter is applied.
/// Any other error is propagated unchanged on the spot. Each call owns its
/// own delay counter, so the executor is stateless across invocations.
pub async fn execute_with_retry(
    conn: &mut dyn Store,
    query: &str,
    rows: Option<&[LogRecord]>,
    policy: RetryPolicy,
) -> Result<(), RetryError> {
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        match conn.execute(query, rows).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                tracing::warn!(
                    "retryable store error: {err}, retrying in {:.1}s (attempt {attempt}/{})",
                    delay.as_secs_f64(),
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) if err.is_retryable() => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    source: err,
                });
            }
            Err(err) => return Err(RetryError::Fatal(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// Store that pops one scripted outcome per execute call.
    struct ScriptedStore {
        outcomes: VecDeque<Result<(), StoreError>>,
        calls: Arc<Mutex<u32>>,
    }

    impl ScriptedStore {
        fn new(outcomes: Vec<Result<(), StoreError>>) -> (Self, Arc<Mutex<u32>>) {
            let calls = Arc::new(Mutex::new(0));
            (
                Self {
                    outcomes: outcomes.into(),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait::async_trait]
    impl Store for ScriptedStore {
        async fn execute(
            &mut self,
            _query: &str,
            _rows: Option<&[LogRecord]>,
        ) -> Result<(), StoreError> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes.pop_front().unwrap_or(Ok(()))
        }

        async fn close(self: Box<Self>) {}
    }

    fn transient() -> StoreError {
        StoreError::Transient("CPU is overloaded".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let (mut store, calls) = ScriptedStore::new(vec![Ok(())]);
        let policy = RetryPolicy::new(3, Duration::from_secs(5));

        execute_with_retry(&mut store, "INSERT", None, policy)
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_with_doubling_backoff() {
        // Fails twice, then succeeds: expect 3 calls and sleeps of 1s + 2s.
        let (mut store, calls) =
            ScriptedStore::new(vec![Err(transient()), Err(transient()), Ok(())]);
        let policy = RetryPolicy::new(5, Duration::from_secs(1));

        let started = Instant::now();
        execute_with_retry(&mut store, "INSERT", None, policy)
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts_on_persistent_transient() {
        let (mut store, calls) = ScriptedStore::new(vec![
            Err(transient()),
            Err(transient()),
            Err(transient()),
            Err(transient()),
        ]);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let err = execute_with_retry(&mut store, "INSERT", None, policy)
            .await
            .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 3);
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_propagates_immediately() {
        let (mut store, calls) =
            ScriptedStore::new(vec![Err(StoreError::Fatal("syntax error".to_string()))]);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let started = Instant::now();
        let err = execute_with_retry(&mut store, "INSERT", None, policy)
            .await
            .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(err, RetryError::Fatal(StoreError::Fatal(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_error_is_not_retried() {
        let (mut store, calls) = ScriptedStore::new(vec![Err(StoreError::Connection(
            "broken pipe".to_string(),
        ))]);
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let err = execute_with_retry(&mut store, "INSERT", None, policy)
            .await
            .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(err.store_error().is_connection());
    }
}

//! Bounded FIFO queue of pending batches.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use logsim_core::LogRecord;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Backpressure signal: the queue stayed full for the whole enqueue wait.
///
/// Carries the rejected batch back to the producer so it can retry without
/// cloning.
#[derive(Error)]
#[error("batch queue full (capacity {capacity})")]
pub struct QueueFullError {
    /// Queue capacity at the time of rejection.
    pub capacity: usize,
    batch: Vec<LogRecord>,
}

impl QueueFullError {
    /// Recover the rejected batch for another enqueue attempt.
    pub fn into_batch(self) -> Vec<LogRecord> {
        self.batch
    }
}

impl fmt::Debug for QueueFullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueFullError")
            .field("capacity", &self.capacity)
            .field("batch_len", &self.batch.len())
            .finish()
    }
}

/// Bounded FIFO of record batches shared by the producer and the workers.
///
/// Batches are delivered in enqueue order, each to exactly one consumer.
/// A full queue backpressures the producer via [`QueueFullError`]; an empty
/// queue times a consumer out with `None` so it can re-check the running
/// flag instead of blocking forever.
pub struct BatchQueue {
    inner: Mutex<VecDeque<Vec<LogRecord>>>,
    capacity: usize,
    not_full: Notify,
    not_empty: Notify,
}

impl BatchQueue {
    /// Create a queue holding at most `capacity` batches.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_full: Notify::new(),
            not_empty: Notify::new(),
        }
    }

    /// Queue capacity in batches.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of batches currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("batch queue mutex poisoned").len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a batch, waiting up to `timeout` for space.
    ///
    /// With a zero timeout this degenerates to a non-blocking try-enqueue.
    pub async fn enqueue(
        &self,
        batch: Vec<LogRecord>,
        timeout: Duration,
    ) -> Result<(), QueueFullError> {
        let deadline = Instant::now() + timeout;
        let mut batch = batch;

        loop {
            {
                let mut queue = self.inner.lock().expect("batch queue mutex poisoned");
                if queue.len() < self.capacity {
                    queue.push_back(batch);
                    drop(queue);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(QueueFullError {
                    capacity: self.capacity,
                    batch,
                });
            }
            let _ = tokio::time::timeout(deadline - now, self.not_full.notified()).await;
        }
    }

    /// Pop the oldest batch, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout; an empty result is not an error.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Vec<LogRecord>> {
        let deadline = Instant::now() + timeout;

        loop {
            {
                let mut queue = self.inner.lock().expect("batch queue mutex poisoned");
                if let Some(batch) = queue.pop_front() {
                    drop(queue);
                    self.not_full.notify_one();
                    return Some(batch);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let _ = tokio::time::timeout(deadline - now, self.not_empty.notified()).await;
        }
    }
}

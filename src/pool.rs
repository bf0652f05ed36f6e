//! Fixed-capacity pool of reusable store connections.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use logsim_core::{Store, StoreConnector, StoreError};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Pool of store connections shared by the insert workers.
///
/// `capacity` connections are created up front; while the pool is under
/// contention, `acquire` trades a short-lived resource overshoot for
/// liveness by creating overflow connections instead of blocking its caller
/// indefinitely. `release` closes connections that no longer fit the idle
/// set, so the pool shrinks back to `capacity` at rest.
pub struct ConnectionPool {
    connector: Arc<dyn StoreConnector>,
    idle: Mutex<Vec<Box<dyn Store>>>,
    capacity: usize,
    acquire_timeout: Duration,
    created: AtomicUsize,
    available: Notify,
}

impl ConnectionPool {
    /// Build the pool, pre-creating `capacity` connections.
    ///
    /// A failure here is fatal to the whole run: a store that cannot even
    /// produce the initial connections is not worth simulating against.
    pub async fn connect(
        connector: Arc<dyn StoreConnector>,
        capacity: usize,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut idle = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            idle.push(connector.connect().await?);
        }

        Ok(Self {
            connector,
            idle: Mutex::new(idle),
            capacity,
            acquire_timeout,
            created: AtomicUsize::new(capacity),
            available: Notify::new(),
        })
    }

    /// Borrow a connection, waiting up to the acquire timeout for an idle
    /// one before creating an overflow connection.
    pub async fn acquire(&self) -> Result<Box<dyn Store>, StoreError> {
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            {
                let mut idle = self.idle.lock().expect("pool mutex poisoned");
                if let Some(conn) = idle.pop() {
                    return Ok(conn);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("connection pool exhausted, creating overflow connection");
                let conn = self.connector.connect().await?;
                self.created.fetch_add(1, Ordering::Relaxed);
                return Ok(conn);
            }
            let _ = tokio::time::timeout(deadline - now, self.available.notified()).await;
        }
    }

    /// Return a borrowed connection to the idle set.
    ///
    /// If the idle set is already at capacity (an overflow connection coming
    /// home), the connection is closed instead of retained. Connections that
    /// failed mid-use must not be released; the worker closes them directly.
    pub async fn release(&self, conn: Box<dyn Store>) {
        let rejected = {
            let mut idle = self.idle.lock().expect("pool mutex poisoned");
            if idle.len() < self.capacity {
                idle.push(conn);
                None
            } else {
                Some(conn)
            }
        };

        match rejected {
            None => self.available.notify_one(),
            Some(conn) => {
                tracing::debug!("idle set full, closing released connection");
                conn.close().await;
            }
        }
    }

    /// Close every currently idle connection.
    ///
    /// Outstanding borrows are not awaited; a connection still held by a
    /// worker is closed by that worker's release path once the idle set is
    /// full, or leaks with its task if the worker was abandoned.
    pub async fn close_all(&self) {
        let drained: Vec<Box<dyn Store>> = {
            let mut idle = self.idle.lock().expect("pool mutex poisoned");
            idle.drain(..).collect()
        };

        for conn in drained {
            conn.close().await;
        }
    }

    /// Connections currently idle in the pool.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().expect("pool mutex poisoned").len()
    }

    /// Connections ever created, including overflow ones.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

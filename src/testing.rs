//! Shared test doubles for the simulator.
//!
//! [`MockConnector`] mints in-memory store connections that record every
//! statement and inserted batch into shared state, and can be scripted to
//! fail: per-call execute failures are queued with
//! [`MockConnector::push_failure`], connect failures with
//! [`MockConnector::fail_next_connect`]. Unit tests and the integration
//! scenarios both drive the real pool/queue/worker machinery against it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use logsim_core::{LogRecord, Store, StoreConnector, StoreError};

/// Shared state behind every connection of one [`MockConnector`].
#[derive(Debug, Default)]
pub struct MockStoreState {
    /// Batches successfully inserted, in completion order.
    pub batches: Vec<Vec<LogRecord>>,
    /// Statements executed without bound rows (e.g. TRUNCATE).
    pub statements: Vec<String>,
    /// Total execute calls, including failed ones.
    pub execute_calls: u64,
    /// Connections handed out so far.
    pub connections_opened: u64,
    /// Connections closed so far.
    pub connections_closed: u64,
    failures: VecDeque<StoreError>,
    connect_failures: u32,
}

impl MockStoreState {
    /// Total records across all successfully inserted batches.
    pub fn records_inserted(&self) -> u64 {
        self.batches.iter().map(|b| b.len() as u64).sum()
    }
}

/// Connector producing scriptable in-memory store connections.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockStoreState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared state for assertions.
    pub fn state(&self) -> Arc<Mutex<MockStoreState>> {
        self.state.clone()
    }

    /// Queue an error to be returned by the next execute call.
    ///
    /// Errors are consumed in order, one per call, across all connections.
    pub fn push_failure(&self, err: StoreError) {
        self.state
            .lock()
            .expect("mock state mutex poisoned")
            .failures
            .push_back(err);
    }

    /// Make the next connect attempt fail.
    pub fn fail_next_connect(&self) {
        self.state
            .lock()
            .expect("mock state mutex poisoned")
            .connect_failures += 1;
    }
}

#[async_trait::async_trait]
impl StoreConnector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Store>, StoreError> {
        let mut state = self.state.lock().expect("mock state mutex poisoned");
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(StoreError::Connection(
                "mock connect failure".to_string(),
            ));
        }
        state.connections_opened += 1;
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<MockStoreState>>,
}

#[async_trait::async_trait]
impl Store for MockConnection {
    async fn execute(&mut self, query: &str, rows: Option<&[LogRecord]>) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("mock state mutex poisoned");
        state.execute_calls += 1;

        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }

        match rows {
            Some(rows) => state.batches.push(rows.to_vec()),
            None => state.statements.push(query.to_string()),
        }
        Ok(())
    }

    async fn close(self: Box<Self>) {
        self.state
            .lock()
            .expect("mock state mutex poisoned")
            .connections_closed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_batches_and_statements() {
        let connector = MockConnector::new();
        let mut conn = connector.connect().await.unwrap();

        conn.execute("TRUNCATE TABLE logs_insert_test", None)
            .await
            .unwrap();
        conn.execute("INSERT", Some(&[])).await.unwrap();

        let state = connector.state();
        let state = state.lock().unwrap();
        assert_eq!(state.execute_calls, 2);
        assert_eq!(state.statements, vec!["TRUNCATE TABLE logs_insert_test"]);
        assert_eq!(state.batches.len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let connector = MockConnector::new();
        connector.push_failure(StoreError::Transient("CPU is overloaded".to_string()));
        let mut conn = connector.connect().await.unwrap();

        assert!(conn.execute("INSERT", Some(&[])).await.is_err());
        assert!(conn.execute("INSERT", Some(&[])).await.is_ok());
    }
}

//! Store capability traits.
//!
//! The simulator treats the target data store as an opaque capability: a
//! connection that can execute a statement, optionally binding a batch of
//! log records, and a connector that can mint fresh connections for the
//! pool. Backends translate their native errors into the [`StoreError`]
//! taxonomy so the retry executor and workers never inspect backend types.

use crate::{LogRecord, StoreError};

/// A single store session.
///
/// Connections are owned by the pool while idle and exclusively borrowed by
/// one worker while in use; they are not shared between tasks.
#[async_trait::async_trait]
pub trait Store: Send {
    /// Execute a statement.
    ///
    /// When `rows` is present, `query` is an `INSERT ... VALUES` prefix (see
    /// [`insert_query`](crate::insert_query)) and the implementation binds
    /// the records in column order, preserving their order within the batch.
    /// When `rows` is absent, `query` is executed as-is.
    async fn execute(&mut self, query: &str, rows: Option<&[LogRecord]>) -> Result<(), StoreError>;

    /// Close the underlying session, releasing its resources.
    async fn close(self: Box<Self>);
}

/// Factory for store connections, shared by the pool and its overflow path.
#[async_trait::async_trait]
pub trait StoreConnector: Send + Sync {
    /// Open a fresh connection to the store.
    async fn connect(&self) -> Result<Box<dyn Store>, StoreError>;
}

//! Core types for the logsim load simulator.
//!
//! This crate holds the leaf pieces shared by the simulator, the data
//! generator, and the store backends:
//!
//! - [`LogRecord`], the immutable log entry value type and its CSV wire
//!   format
//! - the [`Store`] / [`StoreConnector`] capability traits abstracting the
//!   target data store
//! - the [`StoreError`] taxonomy separating transient, fatal, and
//!   connection-level failures
//! - [`execute_with_retry`], the backoff-driven retry executor for store
//!   operations

pub mod error;
pub mod record;
pub mod retry;
pub mod store;

pub use error::{classify_store_message, StoreError};
pub use record::{insert_query, LogRecord};
pub use retry::{execute_with_retry, RetryError, RetryPolicy};
pub use store::{Store, StoreConnector};

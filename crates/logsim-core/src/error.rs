//! Store error taxonomy.

use thiserror::Error;

/// Message fragments that mark a store failure as transient.
///
/// The set is deliberately closed: overload and timeout are the two
/// conditions known to clear on their own, so they are the only ones worth
/// backing off for.
const RETRYABLE_SIGNATURES: [&str; 2] = ["cpu is overloaded", "timeout exceeded"];

/// Errors surfaced by a [`Store`](crate::Store) implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Transient overload or timeout; safe to retry with backoff.
    #[error("transient store error: {0}")]
    Transient(String),

    /// Permanent failure of the operation; retrying cannot help.
    #[error("fatal store error: {0}")]
    Fatal(String),

    /// Transport-level failure; the connection must be discarded.
    #[error("store connection error: {0}")]
    Connection(String),
}

impl StoreError {
    /// Whether the retry executor may re-attempt the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// Whether the owning connection should be discarded rather than reused.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Classify a backend error message as transient or fatal.
///
/// Matches the message against the fixed retryable signature set
/// (overload, timeout), case-insensitively. Store backends call this once
/// when mapping their native errors, so the rest of the system only ever
/// sees tagged categories.
pub fn classify_store_message(message: &str) -> StoreError {
    let lowered = message.to_lowercase();
    if RETRYABLE_SIGNATURES.iter().any(|sig| lowered.contains(sig)) {
        StoreError::Transient(message.to_string())
    } else {
        StoreError::Fatal(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_is_transient() {
        let err = classify_store_message("DB::Exception: CPU is overloaded");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = classify_store_message("Timeout exceeded while receiving data");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert!(classify_store_message("TIMEOUT EXCEEDED").is_retryable());
        assert!(classify_store_message("cpu IS overloaded").is_retryable());
    }

    #[test]
    fn test_unknown_message_is_fatal() {
        let err = classify_store_message("syntax error at or near \"VALUES\"");
        assert!(!err.is_retryable());
        assert!(matches!(err, StoreError::Fatal(_)));
    }

    #[test]
    fn test_connection_is_not_retryable() {
        let err = StoreError::Connection("broken pipe".to_string());
        assert!(!err.is_retryable());
        assert!(err.is_connection());
    }
}

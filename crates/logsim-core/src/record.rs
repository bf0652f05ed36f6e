//! The log record value type and its wire format.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Serde adapter for the `%Y-%m-%d %H:%M:%S` timestamp format used by the
/// log CSV files.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Timestamp layout in log source files.
    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A single audit log entry.
///
/// Records are immutable values with structural equality; once constructed
/// they flow through the batch queue and into the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Event time, second precision.
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    /// Acting user, e.g. `user42@example.com`.
    pub login: String,
    /// Event kind, e.g. `login`, `password_reset`.
    pub event: String,
    /// Originating subsystem, e.g. `auth`, `billing`.
    pub subsystem: String,
    /// Free-text comment.
    pub comment: String,
    /// Free-text event description.
    pub description: String,
}

impl LogRecord {
    /// Column names in insertion order, matching the CSV header and the
    /// target table layout.
    pub const COLUMNS: [&'static str; 6] = [
        "timestamp",
        "login",
        "event",
        "subsystem",
        "comment",
        "description",
    ];
}

/// Build the INSERT statement prefix for a target table.
///
/// The returned statement ends in `VALUES`; store backends append their own
/// placeholder tuples for the rows being bound.
pub fn insert_query(table: &str) -> String {
    format!("INSERT INTO {table} ({}) VALUES", LogRecord::COLUMNS.join(", "))
}

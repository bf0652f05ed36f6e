//! logsim library.
//!
//! A sustained-load log ingestion simulator: log records are read from a CSV
//! source, grouped into randomly sized batches, and driven into a PostgreSQL
//! table through a fixed pool of reusable connections under concurrent
//! worker execution, with bounded buffering, producer backpressure, and
//! retry-with-backoff of transient store failures.
//!
//! # Components
//!
//! - [`source::CsvRecordSource`] — restartable typed record reader
//! - [`queue::BatchQueue`] — bounded FIFO decoupling producer from workers
//! - [`pool::ConnectionPool`] — fixed pool of store connections with
//!   overflow under contention
//! - [`simulator::LoadSimulator`] — orchestrates the producer, workers, and
//!   coordinated shutdown
//! - [`postgres::PostgresConnector`] — the PostgreSQL store backend
//! - [`bench`] — one-shot insert strategy benchmark
//!
//! Delivery is explicitly best-effort: a batch that exhausts its retries is
//! lost and surfaced through logs and counters, never as a run failure.
//!
//! # CLI Usage
//!
//! ```bash
//! # Generate a synthetic corpus
//! logsim generate --output data/logs_data_3_000.csv --rows 3000 --seed 42
//!
//! # Run a 2-minute sustained-load simulation with 3 workers
//! logsim simulate --source data/logs_data_3_000.csv \
//!   --postgres "host=localhost user=postgres dbname=logs" \
//!   --duration-minutes 2 --workers 3
//!
//! # Benchmark insert strategies
//! logsim bench --source data/logs_data_3_000.csv --methods single,bulk \
//!   --results insertion_results.csv
//! ```

use clap::Parser;

pub mod bench;
pub mod config;
pub mod metrics;
pub mod pool;
pub mod postgres;
pub mod queue;
pub mod report;
pub mod simulator;
pub mod source;
pub mod testing;

pub use logsim_core::{
    classify_store_message, execute_with_retry, insert_query, LogRecord, RetryError, RetryPolicy,
    Store, StoreConnector, StoreError,
};

/// Target store connection options, shared by the `simulate` and `bench`
/// commands.
#[derive(Parser, Clone, Debug)]
pub struct StoreOpts {
    /// PostgreSQL connection string
    #[arg(
        long,
        default_value = "host=localhost user=postgres dbname=logs",
        env = "LOGSIM_POSTGRES"
    )]
    pub postgres: String,

    /// Target table for inserted log records
    #[arg(long, default_value = "logs_insert_test", env = "LOGSIM_TABLE")]
    pub table: String,

    /// Attempts per store operation, including the first
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Initial backoff delay in seconds; doubles per retry
    #[arg(long, default_value = "5")]
    pub retry_delay_secs: u64,
}

impl StoreOpts {
    /// Retry policy derived from the CLI knobs.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            std::time::Duration::from_secs(self.retry_delay_secs),
        )
    }
}

//! One-shot insert strategy benchmark.
//!
//! Loads a whole log corpus into memory, then times each requested insert
//! strategy against the target table, truncating between methods so every
//! strategy starts from an empty table. Store operations go through the
//! same retry executor as the simulator.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use logsim_core::{execute_with_retry, insert_query, RetryPolicy, Store, StoreConnector};

use crate::report::{BenchReport, BenchResult};
use crate::source;

/// Insert strategy under measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InsertMethod {
    /// One statement per row.
    Single,
    /// The whole corpus in one statement.
    Bulk,
    /// Fixed-size chunks, one statement per chunk.
    Batched,
}

impl fmt::Display for InsertMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InsertMethod::Single => "single",
            InsertMethod::Bulk => "bulk",
            InsertMethod::Batched => "batched",
        };
        f.write_str(name)
    }
}

/// Benchmark parameters.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// CSV corpus to load.
    pub source_path: PathBuf,
    /// Table the rows are inserted into.
    pub target_table: String,
    /// Strategies to measure, in order.
    pub methods: Vec<InsertMethod>,
    /// Chunk size for [`InsertMethod::Batched`].
    pub batch_size: usize,
    /// Retry behavior for every store operation.
    pub retry: RetryPolicy,
}

/// Run the benchmark and return per-method timings.
pub async fn run_bench(
    config: BenchConfig,
    connector: Arc<dyn StoreConnector>,
) -> Result<BenchReport> {
    let records = source::read_all(&config.source_path)
        .with_context(|| format!("failed to load corpus from {:?}", config.source_path))?;
    if records.is_empty() {
        bail!("corpus {:?} contains no records", config.source_path);
    }
    if config.batch_size == 0 {
        bail!("batch size must be at least 1");
    }
    tracing::info!("loaded {} rows from {:?}", records.len(), config.source_path);

    let mut conn = connector
        .connect()
        .await
        .context("failed to connect to store")?;

    let insert = insert_query(&config.target_table);
    let truncate = format!("TRUNCATE TABLE {}", config.target_table);
    let mut results = Vec::with_capacity(config.methods.len());

    for method in &config.methods {
        tracing::info!("starting {method} insertion of {} rows", records.len());
        let started = Instant::now();

        match method {
            InsertMethod::Single => {
                for record in &records {
                    execute_with_retry(
                        conn.as_mut(),
                        &insert,
                        Some(std::slice::from_ref(record)),
                        config.retry,
                    )
                    .await
                    .with_context(|| format!("{method} insertion failed"))?;
                }
            }
            InsertMethod::Bulk => {
                execute_with_retry(conn.as_mut(), &insert, Some(&records), config.retry)
                    .await
                    .with_context(|| format!("{method} insertion failed"))?;
            }
            InsertMethod::Batched => {
                for chunk in records.chunks(config.batch_size) {
                    execute_with_retry(conn.as_mut(), &insert, Some(chunk), config.retry)
                        .await
                        .with_context(|| format!("{method} insertion failed"))?;
                }
            }
        }

        let duration = started.elapsed();
        let result = BenchResult {
            method: *method,
            duration,
            rows: records.len() as u64,
        };
        tracing::info!(
            "{method} insertion completed in {:.2}s ({:.0} rows/sec)",
            duration.as_secs_f64(),
            result.rows_per_second()
        );
        results.push(result);

        execute_with_retry(conn.as_mut(), &truncate, None, config.retry)
            .await
            .context("failed to truncate target table between methods")?;
    }

    conn.close().await;
    Ok(BenchReport { results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnector;
    use logsim_generator::CsvPopulator;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn config(path: PathBuf, methods: Vec<InsertMethod>) -> BenchConfig {
        BenchConfig {
            source_path: path,
            target_table: "logs_insert_test".to_string(),
            methods,
            batch_size: 10,
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
        }
    }

    fn corpus(rows: u64) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        CsvPopulator::new(42).populate(file.path(), rows).unwrap();
        file
    }

    #[tokio::test]
    async fn test_bulk_inserts_whole_corpus_once() {
        let corpus = corpus(30);
        let connector = MockConnector::new();

        let report = run_bench(
            config(corpus.path().to_path_buf(), vec![InsertMethod::Bulk]),
            Arc::new(connector.clone()),
        )
        .await
        .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].rows, 30);

        let state = connector.state();
        let state = state.lock().unwrap();
        assert_eq!(state.batches.len(), 1);
        assert_eq!(state.batches[0].len(), 30);
        // Truncate ran after the method.
        assert_eq!(state.statements, vec!["TRUNCATE TABLE logs_insert_test"]);
    }

    #[tokio::test]
    async fn test_batched_chunks_the_corpus() {
        let corpus = corpus(25);
        let connector = MockConnector::new();

        run_bench(
            config(corpus.path().to_path_buf(), vec![InsertMethod::Batched]),
            Arc::new(connector.clone()),
        )
        .await
        .unwrap();

        let state = connector.state();
        let state = state.lock().unwrap();
        // 25 rows in chunks of 10: 10 + 10 + 5.
        assert_eq!(state.batches.len(), 3);
        assert_eq!(state.batches[2].len(), 5);
    }

    #[tokio::test]
    async fn test_single_runs_one_statement_per_row() {
        let corpus = corpus(8);
        let connector = MockConnector::new();

        run_bench(
            config(corpus.path().to_path_buf(), vec![InsertMethod::Single]),
            Arc::new(connector.clone()),
        )
        .await
        .unwrap();

        let state = connector.state();
        let state = state.lock().unwrap();
        assert_eq!(state.batches.len(), 8);
        assert!(state.batches.iter().all(|b| b.len() == 1));
    }

    #[tokio::test]
    async fn test_methods_run_in_order_with_truncates() {
        let corpus = corpus(12);
        let connector = MockConnector::new();

        let report = run_bench(
            config(
                corpus.path().to_path_buf(),
                vec![InsertMethod::Bulk, InsertMethod::Batched],
            ),
            Arc::new(connector.clone()),
        )
        .await
        .unwrap();

        assert_eq!(report.results[0].method, InsertMethod::Bulk);
        assert_eq!(report.results[1].method, InsertMethod::Batched);
        assert_eq!(connector.state().lock().unwrap().statements.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        CsvPopulator::new(1).populate(file.path(), 0).unwrap();
        let connector = MockConnector::new();

        let result = run_bench(
            config(file.path().to_path_buf(), vec![InsertMethod::Bulk]),
            Arc::new(connector),
        )
        .await;
        assert!(result.is_err());
    }
}

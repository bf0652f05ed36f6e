//! Metrics collection for simulation runs.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Shared counters updated by the producer and the workers.
///
/// Cloning is cheap; all clones observe the same counters.
#[derive(Clone)]
pub struct SimMetrics {
    batches_enqueued: Arc<AtomicU64>,
    batches_inserted: Arc<AtomicU64>,
    batches_failed: Arc<AtomicU64>,
    records_inserted: Arc<AtomicU64>,
    start_time: Instant,
}

/// Single metrics snapshot (one JSON line in the emission file).
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct MetricsEntry {
    pub timestamp: String,
    pub batches_enqueued: u64,
    pub batches_inserted: u64,
    pub batches_failed: u64,
    pub records_inserted: u64,
    pub throughput_rows_per_sec: f64,
    pub elapsed_secs: f64,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self {
            batches_enqueued: Arc::new(AtomicU64::new(0)),
            batches_inserted: Arc::new(AtomicU64::new(0)),
            batches_failed: Arc::new(AtomicU64::new(0)),
            records_inserted: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record a batch handed to the queue.
    pub fn add_enqueued(&self) {
        self.batches_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully inserted batch of `records` rows.
    pub fn add_inserted(&self, records: u64) {
        self.batches_inserted.fetch_add(1, Ordering::Relaxed);
        self.records_inserted.fetch_add(records, Ordering::Relaxed);
    }

    /// Record a batch lost to a failed insert.
    pub fn add_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsEntry {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let records = self.records_inserted.load(Ordering::Relaxed);

        let throughput = if elapsed > 0.0 {
            records as f64 / elapsed
        } else {
            0.0
        };

        MetricsEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            batches_enqueued: self.batches_enqueued.load(Ordering::Relaxed),
            batches_inserted: self.batches_inserted.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            records_inserted: records,
            throughput_rows_per_sec: throughput,
            elapsed_secs: elapsed,
        }
    }

    /// Start a background task appending a JSONL snapshot every `interval`.
    pub fn start_emission_task(
        &self,
        output_path: PathBuf,
        interval: Duration,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let metrics = self.clone();

        tokio::spawn(async move {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&output_path)
                .await?;

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                let entry = metrics.snapshot();
                let json_line = serde_json::to_string(&entry)?;
                file.write_all(json_line.as_bytes()).await?;
                file.write_all(b"\n").await?;
                file.flush().await?;
            }
        })
    }
}

impl Default for SimMetrics {
    fn default() -> Self {
        Self::new()
    }
}

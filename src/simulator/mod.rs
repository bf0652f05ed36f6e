//! Load simulation orchestration.
//!
//! One producer loop assembles randomly sized batches from the record
//! source and feeds the bounded queue; a fixed set of worker tasks drains
//! the queue through the connection pool. Shutdown is cooperative: a shared
//! running flag is polled by every loop, workers drain remaining batches,
//! and joins are bounded rather than forcibly cancelled.

mod worker;

pub use worker::WorkerStats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use logsim_core::{insert_query, StoreConnector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SimulatorConfig;
use crate::metrics::SimMetrics;
use crate::pool::ConnectionPool;
use crate::queue::BatchQueue;
use crate::source::CsvRecordSource;

/// Pause before retrying after a backpressured enqueue.
const BACKPRESSURE_PAUSE: Duration = Duration::from_secs(1);

/// Pause after a failed connect or a disposed worker connection.
const FAILURE_PAUSE: Duration = Duration::from_secs(1);

/// Handle for requesting a cooperative stop from outside the run.
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Flip the running flag; loops exit at their next poll.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("stop requested, draining workers");
        }
    }
}

/// Totals of one completed simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Wall-clock duration of the whole run, including shutdown.
    pub duration: Duration,
    /// Batches the producer handed to the queue.
    pub batches_enqueued: u64,
    /// Batches successfully inserted.
    pub batches_inserted: u64,
    /// Batches lost to failures (best-effort delivery).
    pub batches_failed: u64,
    /// Records successfully inserted.
    pub records_inserted: u64,
    /// Per-worker totals, indexed by worker id.
    pub worker_stats: Vec<WorkerStats>,
}

impl SimulationReport {
    /// Overall insertion throughput.
    pub fn records_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_inserted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Human-readable run summary.
    pub fn summary(&self) -> String {
        format!(
            "Simulation completed in {:?}\n\
             Batches: {} enqueued, {} inserted, {} lost\n\
             Records: {} inserted ({:.1} records/sec)",
            self.duration,
            self.batches_enqueued,
            self.batches_inserted,
            self.batches_failed,
            self.records_inserted,
            self.records_per_second(),
        )
    }
}

/// Orchestrator owning the queue, the pool, and the run lifecycle.
///
/// A simulator drives exactly one run: `run()` consumes it, and a new run
/// needs a new instance.
pub struct LoadSimulator {
    config: SimulatorConfig,
    pool: Arc<ConnectionPool>,
    queue: Arc<BatchQueue>,
    running: Arc<AtomicBool>,
    metrics: SimMetrics,
}

impl LoadSimulator {
    /// Validate the configuration and build the connection pool.
    ///
    /// Pool construction failure is fatal: nothing is simulated against a
    /// store that cannot produce its initial connections.
    pub async fn new(
        config: SimulatorConfig,
        connector: Arc<dyn StoreConnector>,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid simulator configuration")?;

        let pool = ConnectionPool::connect(
            connector,
            config.effective_pool_size(),
            config.acquire_timeout,
        )
        .await
        .context("failed to build initial connection pool")?;

        Ok(Self {
            queue: Arc::new(BatchQueue::new(config.max_queue_size)),
            pool: Arc::new(pool),
            running: Arc::new(AtomicBool::new(false)),
            metrics: SimMetrics::new(),
            config,
        })
    }

    /// Handle that can stop the run from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Shared metrics counters, e.g. for an emission task.
    pub fn metrics(&self) -> SimMetrics {
        self.metrics.clone()
    }

    /// Run the simulation to its deadline (or an external stop) and return
    /// the aggregated report.
    pub async fn run(self) -> anyhow::Result<SimulationReport> {
        let mut source = CsvRecordSource::open(&self.config.source_path)
            .context("failed to open record source")?;

        tracing::info!(
            "starting simulation: {} workers, batches of {}..={} records, queue capacity {}, running for {:?}",
            self.config.workers_count,
            self.config.min_batch_size,
            self.config.max_batch_size,
            self.config.max_queue_size,
            self.config.duration,
        );

        self.running.store(true, Ordering::SeqCst);
        let started = Instant::now();
        let deadline = started + self.config.duration;

        let workers = self.spawn_workers();
        let produced = self.produce(&mut source, deadline).await;
        // Drain workers and close the pool even when the producer failed.
        let worker_stats = self.shutdown(workers).await;
        let batches_enqueued = produced?;

        let report = SimulationReport {
            duration: started.elapsed(),
            batches_enqueued,
            batches_inserted: worker_stats.iter().map(|s| s.batches_inserted).sum(),
            batches_failed: worker_stats.iter().map(|s| s.batches_failed).sum(),
            records_inserted: worker_stats.iter().map(|s| s.records_inserted).sum(),
            worker_stats,
        };

        tracing::info!("simulation finished");
        Ok(report)
    }

    fn spawn_workers(&self) -> Vec<JoinHandle<WorkerStats>> {
        (0..self.config.workers_count)
            .map(|id| {
                let ctx = worker::WorkerContext {
                    id,
                    queue: self.queue.clone(),
                    pool: self.pool.clone(),
                    running: self.running.clone(),
                    metrics: self.metrics.clone(),
                    insert_statement: insert_query(&self.config.target_table),
                    retry: self.config.retry,
                    dequeue_timeout: self.config.dequeue_timeout,
                    failure_pause: FAILURE_PAUSE,
                };
                tokio::spawn(worker::run(ctx))
            })
            .collect()
    }

    /// Producer loop: assemble batches from the source and enqueue them
    /// with backpressure until the deadline or an external stop.
    async fn produce(
        &self,
        source: &mut CsvRecordSource,
        deadline: Instant,
    ) -> anyhow::Result<u64> {
        let mut rng = StdRng::from_os_rng();
        let mut batches_enqueued = 0u64;

        while self.running.load(Ordering::SeqCst) && Instant::now() < deadline {
            let batch_size = rng.random_range(self.config.min_batch_size..=self.config.max_batch_size);
            let mut batch = Vec::with_capacity(batch_size);
            for _ in 0..batch_size {
                batch.push(
                    source
                        .next_record()
                        .context("record source failed mid-run")?,
                );
            }

            // Backpressure: wait and retry the same batch, never drop it.
            let mut pending = batch;
            loop {
                match self.queue.enqueue(pending, self.config.enqueue_timeout).await {
                    Ok(()) => {
                        self.metrics.add_enqueued();
                        batches_enqueued += 1;
                        break;
                    }
                    Err(err) => {
                        if !self.running.load(Ordering::SeqCst) {
                            tracing::warn!(
                                "stop requested while queue full, abandoning unenqueued batch of {} records",
                                err.into_batch().len()
                            );
                            return Ok(batches_enqueued);
                        }
                        tracing::warn!("batch queue full, waiting before retrying");
                        tokio::time::sleep(BACKPRESSURE_PAUSE).await;
                        pending = err.into_batch();
                    }
                }
            }

            let delay = rng.random_range(
                self.config.min_delay.as_secs_f64()..=self.config.max_delay.as_secs_f64(),
            );
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }

        Ok(batches_enqueued)
    }

    /// Flip the running flag, join workers within the bounded timeout, and
    /// close the pool. Workers that overrun the bound are abandoned, not
    /// cancelled, so in-flight store calls finish or fail on their own.
    async fn shutdown(&self, workers: Vec<JoinHandle<WorkerStats>>) -> Vec<WorkerStats> {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("draining {} workers", workers.len());

        let mut stats = Vec::with_capacity(workers.len());
        for (id, handle) in workers.into_iter().enumerate() {
            match tokio::time::timeout(self.config.join_timeout, handle).await {
                Ok(Ok(worker_stats)) => stats.push(worker_stats),
                Ok(Err(join_err)) => {
                    tracing::error!("worker {id} panicked: {join_err}");
                }
                Err(_) => {
                    tracing::warn!(
                        "worker {id} did not stop within {:?}, abandoning it",
                        self.config.join_timeout
                    );
                }
            }
        }

        self.pool.close_all().await;
        stats
    }
}

//! Insert worker loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use logsim_core::{execute_with_retry, RetryPolicy};

use crate::metrics::SimMetrics;
use crate::pool::ConnectionPool;
use crate::queue::BatchQueue;

/// Per-worker insertion totals, aggregated into the simulation report.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Batches fully inserted by this worker.
    pub batches_inserted: u64,
    /// Records inserted across those batches.
    pub records_inserted: u64,
    /// Batches lost to exhausted retries, fatal errors, or dead connections.
    pub batches_failed: u64,
}

/// Everything one worker task needs; built by the simulator.
pub(crate) struct WorkerContext {
    pub id: usize,
    pub queue: Arc<BatchQueue>,
    pub pool: Arc<ConnectionPool>,
    pub running: Arc<AtomicBool>,
    pub metrics: SimMetrics,
    pub insert_statement: String,
    pub retry: RetryPolicy,
    pub dequeue_timeout: Duration,
    /// Pause after a failed connect or a disposed connection.
    pub failure_pause: Duration,
}

/// Drain the batch queue until the run stops and the queue is empty.
///
/// The loop keeps going while the run is marked running *or* batches remain
/// queued, so work enqueued before shutdown is still delivered. A connection
/// is acquired before each dequeue attempt and released when the iteration
/// ends without using it, so no connection sits idle on a borrowed slot.
pub(crate) async fn run(ctx: WorkerContext) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while ctx.running.load(Ordering::SeqCst) || !ctx.queue.is_empty() {
        let mut conn = match ctx.pool.acquire().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(worker = ctx.id, "failed to open store connection: {err}");
                tokio::time::sleep(ctx.failure_pause).await;
                continue;
            }
        };

        let Some(batch) = ctx.queue.dequeue(ctx.dequeue_timeout).await else {
            ctx.pool.release(conn).await;
            continue;
        };

        let started = Instant::now();
        match execute_with_retry(
            conn.as_mut(),
            &ctx.insert_statement,
            Some(&batch),
            ctx.retry,
        )
        .await
        {
            Ok(()) => {
                let elapsed = started.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 {
                    batch.len() as f64 / elapsed
                } else {
                    0.0
                };
                tracing::info!(
                    worker = ctx.id,
                    "inserted {} records in {elapsed:.2}s ({rate:.1} records/sec)",
                    batch.len()
                );
                stats.batches_inserted += 1;
                stats.records_inserted += batch.len() as u64;
                ctx.metrics.add_inserted(batch.len() as u64);
                ctx.pool.release(conn).await;
            }
            Err(err) if err.store_error().is_connection() => {
                // The session is gone; the batch it was carrying is lost and
                // the connection must not go back to the pool.
                tracing::warn!(
                    worker = ctx.id,
                    "connection failed mid-insert, {} records lost: {err}",
                    batch.len()
                );
                stats.batches_failed += 1;
                ctx.metrics.add_failed();
                conn.close().await;
                tokio::time::sleep(ctx.failure_pause).await;
            }
            Err(err) => {
                tracing::error!(
                    worker = ctx.id,
                    "insert failed, {} records lost: {err}",
                    batch.len()
                );
                stats.batches_failed += 1;
                ctx.metrics.add_failed();
                ctx.pool.release(conn).await;
            }
        }
    }

    stats
}

//! Simulation configuration.

use std::path::PathBuf;
use std::time::Duration;

use logsim_core::RetryPolicy;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min_batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("min_batch_size ({min}) exceeds max_batch_size ({max})")]
    InvertedBatchRange { min: usize, max: usize },

    #[error("min_delay ({min:?}) exceeds max_delay ({max:?})")]
    InvertedDelayRange { min: Duration, max: Duration },

    #[error("workers_count must be at least 1")]
    NoWorkers,

    #[error("max_queue_size must be at least 1")]
    ZeroQueueSize,

    #[error("duration must be non-zero")]
    ZeroDuration,

    #[error("retry max_attempts must be at least 1")]
    ZeroRetryAttempts,
}

/// Knobs for one simulation run.
///
/// Built with `with_*` setters; [`SimulatorConfig::validate`] is called by
/// the simulator before the run starts.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// CSV file the record source reads (and rereads) from.
    pub source_path: PathBuf,
    /// Table the workers insert into.
    pub target_table: String,
    /// Total run duration; the producer stops at this deadline.
    pub duration: Duration,
    /// Smallest batch the producer assembles.
    pub min_batch_size: usize,
    /// Largest batch the producer assembles.
    pub max_batch_size: usize,
    /// Shortest pause between produced batches.
    pub min_delay: Duration,
    /// Longest pause between produced batches.
    pub max_delay: Duration,
    /// Concurrent insert workers.
    pub workers_count: usize,
    /// Batch queue capacity; beyond it the producer is backpressured.
    pub max_queue_size: usize,
    /// Idle connections held by the pool; defaults to `workers_count + 2`.
    pub pool_size: Option<usize>,
    /// How long `acquire` waits before creating an overflow connection.
    pub acquire_timeout: Duration,
    /// How long the producer waits per enqueue attempt.
    pub enqueue_timeout: Duration,
    /// How long a worker waits per dequeue attempt.
    pub dequeue_timeout: Duration,
    /// How long shutdown waits for each worker to finish.
    pub join_timeout: Duration,
    /// Retry behavior for store operations.
    pub retry: RetryPolicy,
}

impl SimulatorConfig {
    /// Create a configuration with the defaults of the reference workload.
    pub fn new(source_path: impl Into<PathBuf>, target_table: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            target_table: target_table.into(),
            duration: Duration::from_secs(2 * 60),
            min_batch_size: 100,
            max_batch_size: 1000,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            workers_count: 3,
            max_queue_size: 10_000,
            pool_size: None,
            acquire_timeout: Duration::from_secs(5),
            enqueue_timeout: Duration::from_secs(5),
            dequeue_timeout: Duration::from_secs(1),
            join_timeout: Duration::from_secs(5),
            retry: RetryPolicy::new(3, Duration::from_secs(5)),
        }
    }

    /// Set the run duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the batch size range.
    pub fn with_batch_size_range(mut self, min: usize, max: usize) -> Self {
        self.min_batch_size = min;
        self.max_batch_size = max;
        self
    }

    /// Set the inter-batch delay range.
    pub fn with_delay_range(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// Set the number of insert workers.
    pub fn with_workers_count(mut self, workers: usize) -> Self {
        self.workers_count = workers;
        self
    }

    /// Set the batch queue capacity.
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Pin the pool size instead of deriving it from the worker count.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Set the retry policy for store operations.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pool acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the producer enqueue timeout.
    pub fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Set the worker dequeue timeout.
    pub fn with_dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    /// Set the per-worker shutdown join timeout.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// The pool size actually used: explicit, or `workers_count + 2`.
    pub fn effective_pool_size(&self) -> usize {
        self.pool_size.unwrap_or(self.workers_count + 2)
    }

    /// Check the configuration for impossible ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.min_batch_size > self.max_batch_size {
            return Err(ConfigError::InvertedBatchRange {
                min: self.min_batch_size,
                max: self.max_batch_size,
            });
        }
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvertedDelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.workers_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::ZeroQueueSize);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulatorConfig {
        SimulatorConfig::new("data/logs.csv", "logs_insert_test")
    }

    #[test]
    fn test_builder() {
        let config = config()
            .with_duration(Duration::from_secs(30))
            .with_batch_size_range(10, 20)
            .with_workers_count(5)
            .with_max_queue_size(50)
            .with_pool_size(4);

        assert_eq!(config.duration, Duration::from_secs(30));
        assert_eq!(config.min_batch_size, 10);
        assert_eq!(config.max_batch_size, 20);
        assert_eq!(config.workers_count, 5);
        assert_eq!(config.max_queue_size, 50);
        assert_eq!(config.effective_pool_size(), 4);
        config.validate().unwrap();
    }

    #[test]
    fn test_pool_size_defaults_to_workers_plus_headroom() {
        let config = config().with_workers_count(3);
        assert_eq!(config.effective_pool_size(), 5);
    }

    #[test]
    fn test_rejects_inverted_batch_range() {
        let config = config().with_batch_size_range(100, 10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedBatchRange { .. })
        ));
    }

    #[test]
    fn test_rejects_inverted_delay_range() {
        let config = config().with_delay_range(Duration::from_secs(5), Duration::from_secs(1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedDelayRange { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = config().with_workers_count(0);
        assert!(matches!(config.validate(), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let config = config().with_batch_size_range(0, 10);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBatchSize)));
    }
}

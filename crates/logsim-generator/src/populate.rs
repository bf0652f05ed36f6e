//! CSV corpus population.

use std::path::Path;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::LogGenerator;

/// Errors raised while writing a generated corpus.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// CSV serialization or write error.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metrics from a population run.
#[derive(Debug, Clone)]
pub struct PopulateMetrics {
    /// Rows written to the output file.
    pub rows_written: u64,
    /// Size of the output file in bytes.
    pub file_size_bytes: u64,
    /// Wall-clock time of the run.
    pub total_duration: Duration,
}

/// Writes a deterministic synthetic log corpus to a CSV file.
pub struct CsvPopulator {
    seed: u64,
}

impl CsvPopulator {
    /// Create a populator with the given generation seed.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Generate `count` records and write them to `path` as headered CSV.
    pub fn populate(&self, path: &Path, count: u64) -> Result<PopulateMetrics, GeneratorError> {
        let started = Instant::now();

        let mut writer = csv::Writer::from_path(path)?;
        let mut generator = LogGenerator::new(self.seed);
        for record in generator.records(count) {
            writer.serialize(&record)?;
        }
        writer.flush()?;

        let file_size_bytes = std::fs::metadata(path)?.len();

        Ok(PopulateMetrics {
            rows_written: count,
            file_size_bytes,
            total_duration: started.elapsed(),
        })
    }
}

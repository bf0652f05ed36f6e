//! Benchmark result reporting.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::bench::InsertMethod;

/// Timing of one insert method over the whole corpus.
#[derive(Debug, Clone)]
pub struct BenchResult {
    /// Insert strategy that was measured.
    pub method: InsertMethod,
    /// Wall-clock time for the full corpus.
    pub duration: Duration,
    /// Rows inserted.
    pub rows: u64,
}

impl BenchResult {
    /// Insertion throughput for this method.
    pub fn rows_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.rows as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Results of a full benchmark run, in execution order.
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub results: Vec<BenchResult>,
}

impl BenchReport {
    /// Human-readable results block for the final log line.
    pub fn summary(&self) -> String {
        let mut summary = String::from("Performance test results:");
        for result in &self.results {
            summary.push_str(&format!(
                "\n{}: {:.2} sec ({:.0} rows/sec)",
                result.method,
                result.duration.as_secs_f64(),
                result.rows_per_second()
            ));
        }
        summary
    }
}

/// Write the results table as CSV: `Method,Time (sec),Rows/sec`.
pub fn save_results(path: &Path, report: &BenchReport) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create results file {path:?}"))?;

    writer.write_record(["Method", "Time (sec)", "Rows/sec"])?;
    for result in &report.results {
        writer.write_record([
            result.method.to_string(),
            format!("{:.2}", result.duration.as_secs_f64()),
            format!("{:.0}", result.rows_per_second()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn report() -> BenchReport {
        BenchReport {
            results: vec![
                BenchResult {
                    method: InsertMethod::Single,
                    duration: Duration::from_secs(10),
                    rows: 3000,
                },
                BenchResult {
                    method: InsertMethod::Bulk,
                    duration: Duration::from_secs(2),
                    rows: 3000,
                },
            ],
        }
    }

    #[test]
    fn test_rows_per_second() {
        let report = report();
        assert_eq!(report.results[0].rows_per_second(), 300.0);
        assert_eq!(report.results[1].rows_per_second(), 1500.0);
    }

    #[test]
    fn test_summary_lists_methods() {
        let summary = report().summary();
        assert!(summary.contains("single: 10.00 sec (300 rows/sec)"));
        assert!(summary.contains("bulk: 2.00 sec (1500 rows/sec)"));
    }

    #[test]
    fn test_save_results_csv_layout() {
        let output = NamedTempFile::new().unwrap();
        save_results(output.path(), &report()).unwrap();

        let content = std::fs::read_to_string(output.path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Method,Time (sec),Rows/sec"));
        assert_eq!(lines.next(), Some("single,10.00,300"));
        assert_eq!(lines.next(), Some("bulk,2.00,1500"));
    }
}

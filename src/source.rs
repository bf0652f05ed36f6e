//! Restartable CSV record source.

use std::fs::File;
use std::path::{Path, PathBuf};

use logsim_core::LogRecord;
use thiserror::Error;

/// Errors raised by the record source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The underlying file could not be opened.
    #[error("cannot open log source {path:?}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A row could not be parsed into a record.
    #[error("malformed record in {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The file has a header but no data rows, so it can never yield a
    /// record even after reopening.
    #[error("log source {path:?} contains no records")]
    Empty { path: PathBuf },
}

type RecordIter = csv::DeserializeRecordsIntoIter<File, LogRecord>;

/// Lazy, restartable sequence of log records backed by a CSV file.
///
/// When the file is exhausted mid-read the source transparently reopens it
/// and continues from the top, so callers can draw arbitrarily many records
/// from a finite file. Exhaustion is therefore never surfaced as an error;
/// only a missing file, a malformed row, or a file with no data rows is.
pub struct CsvRecordSource {
    path: PathBuf,
    records: RecordIter,
}

impl std::fmt::Debug for CsvRecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvRecordSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CsvRecordSource {
    /// Open the source, failing if the file cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();
        let records = open_reader(&path)?;
        Ok(Self { path, records })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Yield the next record, reopening the file on exhaustion.
    pub fn next_record(&mut self) -> Result<LogRecord, SourceError> {
        match self.records.next() {
            Some(Ok(record)) => Ok(record),
            Some(Err(source)) => Err(SourceError::Malformed {
                path: self.path.clone(),
                source,
            }),
            None => {
                tracing::debug!("log source {:?} exhausted, reopening", self.path);
                self.records = open_reader(&self.path)?;
                match self.records.next() {
                    Some(Ok(record)) => Ok(record),
                    Some(Err(source)) => Err(SourceError::Malformed {
                        path: self.path.clone(),
                        source,
                    }),
                    None => Err(SourceError::Empty {
                        path: self.path.clone(),
                    }),
                }
            }
        }
    }
}

fn open_reader(path: &Path) -> Result<RecordIter, SourceError> {
    let reader = csv::Reader::from_path(path).map_err(|source| SourceError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(reader.into_deserialize())
}

/// Read every record of the file at once, in file order.
///
/// Used by the benchmark, which needs the whole corpus in memory rather
/// than a cycling stream.
pub fn read_all(path: &Path) -> Result<Vec<LogRecord>, SourceError> {
    let mut records = Vec::new();
    for result in open_reader(path)? {
        records.push(result.map_err(|source| SourceError::Malformed {
            path: path.to_path_buf(),
            source,
        })?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(i: u32) -> LogRecord {
        LogRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, i)
                .unwrap(),
            login: format!("user{i}@gmail.com"),
            event: "login".to_string(),
            subsystem: "auth".to_string(),
            comment: format!("comment {i}"),
            description: "User authentication in the system".to_string(),
        }
    }

    fn write_fixture(records: &[LogRecord]) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let mut writer = csv::Writer::from_path(file.path()).unwrap();
        for record in records {
            writer.serialize(record).unwrap();
        }
        writer.flush().unwrap();
        file
    }

    #[test]
    fn test_yields_records_in_file_order() {
        let corpus: Vec<_> = (0..5).map(record).collect();
        let fixture = write_fixture(&corpus);
        let mut source = CsvRecordSource::open(fixture.path()).unwrap();

        for expected in &corpus {
            assert_eq!(&source.next_record().unwrap(), expected);
        }
    }

    #[test]
    fn test_restarts_on_exhaustion() {
        // Draw N records from a source of M < N rows; the source must cycle.
        let corpus: Vec<_> = (0..4).map(record).collect();
        let fixture = write_fixture(&corpus);
        let mut source = CsvRecordSource::open(fixture.path()).unwrap();

        for i in 0..11 {
            let rec = source.next_record().unwrap();
            assert_eq!(rec, corpus[i % corpus.len()], "record {i} mismatched");
        }
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = CsvRecordSource::open("/nonexistent/logs.csv").unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "timestamp,login,event,subsystem,comment,description"
        )
        .unwrap();
        file.flush().unwrap();

        let mut source = CsvRecordSource::open(file.path()).unwrap();
        let err = source.next_record().unwrap_err();
        assert!(matches!(err, SourceError::Empty { .. }));
    }

    #[test]
    fn test_malformed_row_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "timestamp,login,event,subsystem,comment,description"
        )
        .unwrap();
        writeln!(file, "not-a-timestamp,a,b,c,d,e").unwrap();
        file.flush().unwrap();

        let mut source = CsvRecordSource::open(file.path()).unwrap();
        let err = source.next_record().unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn test_read_all_returns_whole_file() {
        let corpus: Vec<_> = (0..7).map(record).collect();
        let fixture = write_fixture(&corpus);

        let records = read_all(fixture.path()).unwrap();
        assert_eq!(records, corpus);
    }
}

//! 📝 CSV-file ledger
//!
//! One row per line, same column order as every other backend. The file (and
//! its directory) is created on first append; a missing file reads as an
//! empty ledger.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use super::{LedgerError, LedgerStore};

pub struct CsvLedgerStore {
    path: PathBuf,
}

impl CsvLedgerStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_for_read(&self) -> Result<Option<File>, LedgerError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LedgerError::unavailable(format!(
                "failed to open {:?}: {}",
                self.path, e
            ))),
        }
    }
}

#[async_trait]
impl LedgerStore for CsvLedgerStore {
    fn name(&self) -> &str {
        "csv"
    }

    async fn read_last_row(&self) -> Result<Option<Vec<String>>, LedgerError> {
        let Some(file) = self.open_for_read()? else {
            debug!("📝 No ledger file at {:?}", self.path);
            return Ok(None);
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut last = None;
        for record in reader.records() {
            let record = record.map_err(|e| {
                LedgerError::unavailable(format!("failed to read {:?}: {}", self.path, e))
            })?;
            last = Some(record);
        }

        Ok(last.map(|r| r.iter().map(str::to_string).collect()))
    }

    async fn append_row(&self, fields: &[String]) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LedgerError::unavailable(format!("failed to create {:?}: {}", parent, e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::unavailable(format!("failed to open {:?}: {}", self.path, e)))?;

        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(fields)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| LedgerError::unavailable(format!("failed to write {:?}: {}", self.path, e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("ledger.csv"));
        assert!(store.read_last_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_then_read_last() {
        let dir = tempdir().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("nested").join("ledger.csv"));

        store.append_row(&row(&["ExecutionDate", "ObservationDate"])).await.unwrap();
        store.append_row(&row(&["2024-05-06", "2024-05-03"])).await.unwrap();
        store.append_row(&row(&["2024-05-07", "2024-05-06"])).await.unwrap();

        assert_eq!(
            store.read_last_row().await.unwrap(),
            Some(row(&["2024-05-07", "2024-05-06"]))
        );

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.starts_with("ExecutionDate,ObservationDate\n"));
    }

    #[tokio::test]
    async fn test_fields_with_commas_and_quotes_survive() {
        let dir = tempdir().unwrap();
        let store = CsvLedgerStore::new(dir.path().join("ledger.csv"));
        let fields = row(&[
            "2024-05-06",
            "🔴yield curve inverted (-0.10), 🟡mild tightening",
            r#"{"vix":25.0,"observation_date":"2024-05-03"}"#,
        ]);

        store.append_row(&fields).await.unwrap();
        assert_eq!(store.read_last_row().await.unwrap(), Some(fields));
    }

    #[tokio::test]
    async fn test_unwritable_path_is_unavailable() {
        let dir = tempdir().unwrap();
        // A directory where the file should be
        let store = CsvLedgerStore::new(dir.path());
        let err = store.append_row(&row(&["x"])).await.unwrap_err();
        assert!(matches!(err, LedgerError::PersistenceUnavailable(_)));
    }
}

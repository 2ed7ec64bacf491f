//! Durable audit store writing one JSON record per line.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{AuditError, AuditRecord, AuditStore};
use crate::config::CaptureConfig;

/// Appends audit records to a file, one JSON object per line.
///
/// Each append is written with a single `write_all` of the full line and then
/// synced, so a record is either entirely on disk or absent.
#[derive(Debug)]
pub struct JsonLinesAuditStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesAuditStore {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Opens the audit file named in `config`.
    ///
    /// Returns `None` when the configuration names no audit file.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be opened.
    pub fn from_config(config: &CaptureConfig) -> Result<Option<Self>, AuditError> {
        config.audit_log.as_deref().map(Self::open).transpose()
    }

    /// Path of the audit file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back every record stored at `path`, skipping blank lines.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be read, or
    /// [`AuditError::Encode`] if a line is not a valid record.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditRecord>, AuditError> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .map_err(|err| AuditError::Encode(err.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }
}

impl AuditStore for JsonLinesAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_vec(record).map_err(|err| AuditError::Encode(err.to_string()))?;
        line.push(b'\n');

        let mut file = self.file.lock();
        file.write_all(&line)?;
        file.sync_data()?;
        tracing::debug!(
            path = %self.path.display(),
            table = %record.table_name,
            status = ?record.status,
            "appended audit record"
        );
        Ok(())
    }
}

//! In-memory audit store.

use parking_lot::Mutex;

use super::{AuditError, AuditRecord, AuditStatus, AuditStore};

/// Audit records kept in memory, in append order.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record, in append order.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    /// Returns a copy of the records with `status`.
    #[must_use]
    pub fn with_status(&self, status: AuditStatus) -> Vec<AuditRecord> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.status == status)
            .cloned()
            .collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns whether no record was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditStore for MemoryAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

//! Append-only audit trail of captured mutations.
//!
//! Every mutation the hook sees leaves exactly one [`AuditRecord`]: `SUCCESS`
//! when the event was built and published, `ERROR` with [`ErrorDetails`] when
//! any step failed. Records are never updated or deleted.

mod jsonl;
mod memory;

use serde::{Deserialize, Serialize};

use crate::event::ChangeEvent;
use crate::row::{Operation, Projection};

pub use jsonl::JsonLinesAuditStore;
pub use memory::MemoryAuditStore;

/// Outcome stored on an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    /// The event was built and published.
    Success,
    /// Processing failed; see the record's error details.
    Error,
}

/// Code and message of the fault behind an `ERROR` record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Stable code of the fault class.
    #[serde(rename = "errorCode")]
    pub error_code: String,
    /// Human-readable description, prefixed with the code.
    pub message: String,
}

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Identifier of the writing transaction.
    pub transaction_id: u64,
    /// Key projection of the row after the write.
    pub new_row: Option<Projection>,
    /// Key projection of the row before the write.
    pub old_row: Option<Projection>,
    /// Indexed fields of the table, empty if the catalog was not reached.
    pub indices: Vec<String>,
    /// Kind of write.
    pub tg_op: Operation,
    /// Table name.
    pub table_name: String,
    /// Schema name.
    pub schema_name: String,
    /// Changed fields, on updates only.
    pub changed_fields: Option<Vec<String>>,
    /// Whether processing succeeded.
    pub status: AuditStatus,
    /// Fault behind an `ERROR` record; `None` on success.
    pub error_details: Option<ErrorDetails>,
    /// Seconds since the Unix epoch at which the mutation was captured.
    pub recorded_at: f64,
}

impl AuditRecord {
    fn from_event(
        event: &ChangeEvent,
        status: AuditStatus,
        error_details: Option<ErrorDetails>,
        recorded_at: f64,
    ) -> Self {
        Self {
            transaction_id: event.transaction_id,
            new_row: event.new_projection.clone(),
            old_row: event.old_projection.clone(),
            indices: event.indices.clone(),
            tg_op: event.operation,
            table_name: event.table.clone(),
            schema_name: event.schema.clone(),
            changed_fields: event.changed_fields.clone(),
            status,
            error_details,
            recorded_at,
        }
    }

    /// A `SUCCESS` record of a published event.
    #[must_use]
    pub fn success(event: &ChangeEvent, recorded_at: f64) -> Self {
        Self::from_event(event, AuditStatus::Success, None, recorded_at)
    }

    /// An `ERROR` record of the partially built `event`.
    #[must_use]
    pub fn failure(event: &ChangeEvent, details: ErrorDetails, recorded_at: f64) -> Self {
        Self::from_event(event, AuditStatus::Error, Some(details), recorded_at)
    }
}

/// Errors raised by an audit append.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// The underlying storage failed.
    #[error("audit store I/O failed: {0}")]
    Io(String),

    /// The record could not be encoded.
    #[error("cannot encode audit record: {0}")]
    Encode(String),

    /// The store refused the append.
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// An append-only store of audit records.
///
/// Implementations accept concurrent appends without coordination between
/// callers.
pub trait AuditStore {
    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns an [`AuditError`] if the record was not stored.
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

impl<A: AuditStore + ?Sized> AuditStore for &A {
    #[inline]
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        A::append(self, record)
    }
}

impl<A: AuditStore + ?Sized> AuditStore for std::sync::Arc<A> {
    #[inline]
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        A::append(self, record)
    }
}

/// Store type of a hook built without an audit trail. It has no values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoAudit {}

impl AuditStore for NoAudit {
    fn append(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        match *self {}
    }
}

//! Submodule defining the faults the capture pipeline can run into.

use crate::audit::{AuditError, ErrorDetails};
use crate::notify::NotifyError;

/// Error code recorded when the catalog has no entry for the mutated table.
pub const CATALOG_MISSING: &str = "CC001";
/// Error code recorded when a row image is not a field map.
pub const PROJECTION_FAILURE: &str = "CC002";
/// Error code recorded when the live channel rejects or cannot carry a payload.
pub const NOTIFY_FAILURE: &str = "CC003";
/// Error code recorded when the payload exceeds the live channel's size limit.
pub const PAYLOAD_TOO_LARGE: &str = "CC004";
/// Error code logged when the audit append itself fails.
pub const AUDIT_WRITE_FAILURE: &str = "CC005";

/// Faults raised while turning a mutation into a published, audited event.
///
/// None of these ever reach the write that triggered the capture: the hook
/// converts them into an `ERROR` audit record or, failing that, a log line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The catalog has no entry for the table.
    #[error("no catalog entry for table '{0}'")]
    CatalogMissing(String),

    /// A row image handed to the projector is not a field map.
    #[error("malformed {image} row image for table '{table}': expected an object, got {found}")]
    ProjectionFailure {
        /// Table whose row image was malformed.
        table: String,
        /// Which image was malformed, `"old"` or `"new"`.
        image: &'static str,
        /// JSON kind that was found instead of an object.
        found: &'static str,
    },

    /// Publishing on the live channel failed.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// Appending to the audit store failed.
    #[error(transparent)]
    AuditWrite(#[from] AuditError),
}

impl CaptureError {
    /// Returns the stable error code recorded as `errorCode`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::CatalogMissing(_) => CATALOG_MISSING,
            Self::ProjectionFailure { .. } => PROJECTION_FAILURE,
            Self::Notify(NotifyError::PayloadTooLarge { .. }) => PAYLOAD_TOO_LARGE,
            Self::Notify(_) => NOTIFY_FAILURE,
            Self::AuditWrite(_) => AUDIT_WRITE_FAILURE,
        }
    }

    /// Returns the `{errorCode, message}` pair stored on an `ERROR` audit record.
    ///
    /// The message is prefixed with the code, so that a bare log line still
    /// identifies the fault class.
    #[must_use]
    pub fn details(&self) -> ErrorDetails {
        let code = self.code();
        ErrorDetails {
            error_code: code.into(),
            message: format!("{code}: {self}"),
        }
    }
}

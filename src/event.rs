//! The change event published on the live channel.
//!
//! Payloads are JSON objects of the form:
//!
//! ```json
//! {"xmin":4211,"new":{"id":1,"customer_id":7},"old":{"id":1,"customer_id":7},
//!  "indices":["status"],"tg_op":"UPDATE","table":"orders","schema":"public",
//!  "changed_fields":["status"]}
//! ```
//!
//! `changed_fields` is only present on `UPDATE` events. Consumers share one
//! channel per tenant and filter on `table` and `schema`.
//!
//! # Example
//!
//! ```
//! use capture_hook::event::parse;
//! use capture_hook::Operation;
//!
//! let payload = r#"{"xmin":4211,"new":null,"old":{"id":1},"indices":["status"],"tg_op":"DELETE","table":"orders","schema":"public"}"#;
//! let event = parse(payload).unwrap();
//!
//! assert_eq!(event.operation, Operation::Delete);
//! assert_eq!(event.changed_fields, None);
//! ```

use serde::{Deserialize, Serialize};

use crate::notify::NotifyError;
use crate::row::{Mutation, Operation, Projection};

/// Structured description of one row mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Identifier of the writing transaction. Groups events, does not order them.
    #[serde(rename = "xmin")]
    pub transaction_id: u64,
    /// Key projection of the row after the write.
    #[serde(rename = "new")]
    pub new_projection: Option<Projection>,
    /// Key projection of the row before the write.
    #[serde(rename = "old")]
    pub old_projection: Option<Projection>,
    /// Indexed fields of the table.
    pub indices: Vec<String>,
    /// Kind of write.
    #[serde(rename = "tg_op")]
    pub operation: Operation,
    /// Table name.
    pub table: String,
    /// Schema name.
    pub schema: String,
    /// Fields whose value changed, on updates only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_fields: Option<Vec<String>>,
}

impl ChangeEvent {
    /// Starts an event for `mutation` with no projections and no indices.
    ///
    /// The hook fills the remaining fields stage by stage, so that a fault
    /// midway still leaves whatever was computed for the error record.
    #[must_use]
    pub fn for_mutation(mutation: &Mutation) -> Self {
        Self {
            transaction_id: mutation.transaction_id,
            new_projection: None,
            old_projection: None,
            indices: Vec::new(),
            operation: mutation.operation,
            table: mutation.table.clone(),
            schema: mutation.schema.clone(),
            changed_fields: None,
        }
    }

    /// Serializes the event to its channel payload.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Serialize`] if serialization fails.
    pub fn to_payload(&self) -> Result<String, NotifyError> {
        serde_json::to_string(self).map_err(|err| NotifyError::Serialize(err.to_string()))
    }
}

/// Parses a channel payload back into an event.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the JSON is malformed.
pub fn parse(payload: &str) -> Result<ChangeEvent, serde_json::Error> {
    serde_json::from_str(payload)
}

//! Row mutations as seen by the capture hook.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CaptureError;

/// A full row image: field name to value, in column order.
pub type RowImage = serde_json::Map<String, Value>;

/// The catalog-filtered subset of a [`RowImage`].
pub type Projection = serde_json::Map<String, Value>;

/// The kind of write that fired the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
    /// The table was truncated.
    Truncate,
}

impl Operation {
    /// Returns the operation name as carried in `tg_op`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row mutation, handed to the hook by the write path.
///
/// Row images are JSON values as the storage engine renders them; they are
/// expected to be objects. An image the operation does not produce (no `old`
/// on insert, no `new` on delete or truncate) is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Identifier of the writing transaction.
    pub transaction_id: u64,
    /// Kind of write.
    pub operation: Operation,
    /// Schema of the mutated table.
    pub schema: String,
    /// Name of the mutated table.
    pub table: String,
    /// Row state before the write.
    pub old: Option<Value>,
    /// Row state after the write.
    pub new: Option<Value>,
}

impl Mutation {
    fn new(
        transaction_id: u64,
        operation: Operation,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id,
            operation,
            schema: schema.into(),
            table: table.into(),
            old: None,
            new: None,
        }
    }

    /// An `INSERT` producing `new`.
    #[must_use]
    pub fn insert(
        transaction_id: u64,
        schema: impl Into<String>,
        table: impl Into<String>,
        new: Value,
    ) -> Self {
        Self {
            new: Some(new),
            ..Self::new(transaction_id, Operation::Insert, schema, table)
        }
    }

    /// An `UPDATE` turning `old` into `new`.
    #[must_use]
    pub fn update(
        transaction_id: u64,
        schema: impl Into<String>,
        table: impl Into<String>,
        old: Value,
        new: Value,
    ) -> Self {
        Self {
            old: Some(old),
            new: Some(new),
            ..Self::new(transaction_id, Operation::Update, schema, table)
        }
    }

    /// A `DELETE` removing `old`.
    #[must_use]
    pub fn delete(
        transaction_id: u64,
        schema: impl Into<String>,
        table: impl Into<String>,
        old: Value,
    ) -> Self {
        Self {
            old: Some(old),
            ..Self::new(transaction_id, Operation::Delete, schema, table)
        }
    }

    /// A `TRUNCATE` of the whole table. Carries no row images.
    #[must_use]
    pub fn truncate(
        transaction_id: u64,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self::new(transaction_id, Operation::Truncate, schema, table)
    }

    /// Returns the old image as a field map.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::ProjectionFailure`] if the image is present but
    /// is not a JSON object.
    pub fn old_image(&self) -> Result<Option<&RowImage>, CaptureError> {
        as_row_image(self.old.as_ref(), &self.table, "old")
    }

    /// Returns the new image as a field map.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::ProjectionFailure`] if the image is present but
    /// is not a JSON object.
    pub fn new_image(&self) -> Result<Option<&RowImage>, CaptureError> {
        as_row_image(self.new.as_ref(), &self.table, "new")
    }
}

impl Mutation {
    /// Returns both images of an `UPDATE`, which must be present.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::ProjectionFailure`] if either image is absent
    /// or is not a JSON object.
    pub fn update_images(&self) -> Result<(&RowImage, &RowImage), CaptureError> {
        let old = self.old_image()?.ok_or_else(|| self.absent("old"))?;
        let new = self.new_image()?.ok_or_else(|| self.absent("new"))?;
        Ok((old, new))
    }

    fn absent(&self, which: &'static str) -> CaptureError {
        CaptureError::ProjectionFailure {
            table: self.table.clone(),
            image: which,
            found: "null",
        }
    }
}

fn as_row_image<'a>(
    image: Option<&'a Value>,
    table: &str,
    which: &'static str,
) -> Result<Option<&'a RowImage>, CaptureError> {
    match image {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(fields)) => Ok(Some(fields)),
        Some(other) => Err(CaptureError::ProjectionFailure {
            table: table.into(),
            image: which,
            found: json_kind(other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

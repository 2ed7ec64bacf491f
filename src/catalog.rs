//! Per-table metadata deciding which fields a change event may carry.
//!
//! The catalog is owned outside this crate. The hook only reads it, once per
//! mutation, through the [`Catalog`] trait.

mod memory;

use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::errors::CaptureError;

pub use memory::MemoryCatalog;

/// An ordered set of field names.
pub type FieldSet = IndexSet<String>;

/// Catalog row for one monitored table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Name of the table the entry describes.
    pub table_name: String,
    /// Primary-key fields.
    #[serde(default)]
    pub primary_keys: FieldSet,
    /// Foreign-key fields.
    #[serde(default)]
    pub foreign_keys: FieldSet,
    /// Fields indexed by downstream consumers.
    #[serde(default)]
    pub indices: FieldSet,
}

impl CatalogEntry {
    /// Creates an entry from field name lists.
    #[must_use]
    pub fn new<S: AsRef<str>>(
        table_name: impl Into<String>,
        primary_keys: &[S],
        foreign_keys: &[S],
        indices: &[S],
    ) -> Self {
        fn collect<S: AsRef<str>>(names: &[S]) -> FieldSet {
            names.iter().map(|name| name.as_ref().to_owned()).collect()
        }

        Self {
            table_name: table_name.into(),
            primary_keys: collect(primary_keys),
            foreign_keys: collect(foreign_keys),
            indices: collect(indices),
        }
    }

    /// Returns whether `field` is a primary or a foreign key.
    #[must_use]
    pub fn is_key(&self, field: &str) -> bool {
        self.primary_keys.contains(field) || self.foreign_keys.contains(field)
    }

    /// Returns the indexed field names as a plain list.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        self.indices.iter().cloned().collect()
    }
}

/// Read-only lookup of catalog entries by table name.
pub trait Catalog {
    /// Returns the entry for `table`, or `None` if the table is not described.
    fn lookup(&self, table: &str) -> Option<Arc<CatalogEntry>>;
}

impl<C: Catalog + ?Sized> Catalog for &C {
    #[inline]
    fn lookup(&self, table: &str) -> Option<Arc<CatalogEntry>> {
        C::lookup(self, table)
    }
}

impl<C: Catalog + ?Sized> Catalog for Arc<C> {
    #[inline]
    fn lookup(&self, table: &str) -> Option<Arc<CatalogEntry>> {
        C::lookup(self, table)
    }
}

/// Looks up `table`, turning a missing entry into a capture fault.
///
/// # Errors
///
/// Returns [`CaptureError::CatalogMissing`] if the catalog has no entry.
pub fn resolve<C: Catalog + ?Sized>(
    catalog: &C,
    table: &str,
) -> Result<Arc<CatalogEntry>, CaptureError> {
    catalog
        .lookup(table)
        .ok_or_else(|| CaptureError::CatalogMissing(table.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_row() {
        let json = r#"{"table_name":"orders","primary_keys":["id"],"foreign_keys":["customer_id"],"indices":["status"]}"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(
            entry,
            CatalogEntry::new("orders", &["id"], &["customer_id"], &["status"])
        );
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let entry: CatalogEntry = serde_json::from_str(r#"{"table_name":"tags"}"#).unwrap();
        assert!(entry.primary_keys.is_empty());
        assert!(entry.foreign_keys.is_empty());
        assert!(entry.index_names().is_empty());
    }

    #[test]
    fn test_is_key() {
        let entry = CatalogEntry::new("orders", &["id"], &["customer_id"], &["status"]);
        assert!(entry.is_key("id"));
        assert!(entry.is_key("customer_id"));
        assert!(!entry.is_key("status"));
    }

    #[test]
    fn test_resolve_missing_table() {
        let catalog = MemoryCatalog::default();
        assert_eq!(
            resolve(&catalog, "legacy_items").unwrap_err(),
            CaptureError::CatalogMissing("legacy_items".into())
        );
    }
}

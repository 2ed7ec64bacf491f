//! In-memory catalog, loaded from catalog rows.

use std::sync::Arc;

use hashbrown::HashMap;

use super::{Catalog, CatalogEntry};

/// A catalog held in memory, keyed by table name.
///
/// # Example
///
/// ```
/// use capture_hook::catalog::{Catalog, CatalogEntry, MemoryCatalog};
///
/// let catalog = MemoryCatalog::from_entries([CatalogEntry::new(
///     "orders",
///     &["id"],
///     &["customer_id"],
///     &["status"],
/// )]);
/// assert!(catalog.lookup("orders").is_some());
/// assert!(catalog.lookup("legacy_items").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: HashMap<String, Arc<CatalogEntry>>,
}

impl MemoryCatalog {
    /// Builds a catalog from entries. Later entries replace earlier ones for the
    /// same table.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    /// Parses a JSON array of catalog rows.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let rows: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(rows))
    }

    /// Adds or replaces the entry for its table.
    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries
            .insert(entry.table_name.clone(), Arc::new(entry));
    }

    /// Number of described tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no table is described.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Catalog for MemoryCatalog {
    fn lookup(&self, table: &str) -> Option<Arc<CatalogEntry>> {
        self.entries.get(table).cloned()
    }
}

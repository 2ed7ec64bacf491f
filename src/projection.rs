//! Reduction of full row images to their catalog-declared key fields.

use crate::catalog::{CatalogEntry, FieldSet};
use crate::row::{Projection, RowImage};

/// Keeps only the fields of `image` named in one of `allowed`.
///
/// Fields keep the image's column order and their original values. An absent
/// image, or one sharing no field with `allowed`, projects to `None`.
#[must_use]
pub fn project(image: Option<&RowImage>, allowed: &[&FieldSet]) -> Option<Projection> {
    retain(image, |field| allowed.iter().any(|set| set.contains(field)))
}

fn retain(image: Option<&RowImage>, keep: impl Fn(&str) -> bool) -> Option<Projection> {
    let projection: Projection = image?
        .iter()
        .filter(|(field, _)| keep(field.as_str()))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();
    (!projection.is_empty()).then_some(projection)
}

/// Projects the row a `DELETE` removed: primary-key fields only.
#[must_use]
pub fn project_deleted(old: Option<&RowImage>, entry: &CatalogEntry) -> Option<Projection> {
    project(old, &[&entry.primary_keys])
}

/// Projects an `INSERT` or `UPDATE` image: primary- and foreign-key fields.
#[must_use]
pub fn project_keys(image: Option<&RowImage>, entry: &CatalogEntry) -> Option<Projection> {
    retain(image, |field| entry.is_key(field))
}

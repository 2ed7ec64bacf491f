//! Changed-field detection for updates.

use crate::row::RowImage;

/// Returns the fields of `new` whose `(name, value)` pair is not in `old`.
///
/// Works on full row images, not projections, so that non-key columns are
/// seen. Names come out in the new image's column order. The difference is
/// one-sided: a field present only in `old` is never reported, while a field
/// present only in `new` always is.
///
/// # Example
///
/// ```
/// use capture_hook::diff::changed_fields;
/// use serde_json::json;
///
/// let old = json!({"id": 1, "status": "PENDING", "legacy": 0});
/// let new = json!({"id": 1, "status": "SHIPPED"});
/// let changed = changed_fields(new.as_object().unwrap(), old.as_object().unwrap());
/// assert_eq!(changed, ["status"]);
/// ```
#[must_use]
pub fn changed_fields(new: &RowImage, old: &RowImage) -> Vec<String> {
    new.iter()
        .filter(|&(field, value)| old.get(field) != Some(value))
        .map(|(field, _)| field.clone())
        .collect()
}

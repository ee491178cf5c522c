use serde::Serialize;

/// Computes the JSON patch turning `before` into `after`.
///
/// Used to report the fields tenancy defaulting filled in, so the persisted
/// object carries the defaults.
pub fn diff<T: Serialize>(before: &T, after: &T) -> Result<json_patch::Patch, serde_json::Error> {
    let before = serde_json::to_value(before)?;
    let after = serde_json::to_value(after)?;
    Ok(json_patch::diff(&before, &after))
}

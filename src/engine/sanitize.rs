//! Field sanitizer
//!
//! Strips volatile or server-assigned fields so that snapshots are stable
//! across re-fetches and write bodies only carry restorable fields.

use crate::resource::registry::STRUCTURAL_FIELDS;
use crate::resource::Resource;
use serde_json::Value;

const ATTRIBUTES: &str = "attributes";

/// Remove banlisted keys at the top level and inside `attributes`.
pub fn sanitize_for_compare<S: AsRef<str>>(resource: &Resource, banlist: &[S]) -> Resource {
    let banned = |key: &str| banlist.iter().any(|b| b.as_ref() == key);

    resource
        .iter()
        .filter(|(key, _)| !banned(key))
        .map(|(key, value)| {
            let value = match value {
                Value::Object(attributes) if key == ATTRIBUTES => Value::Object(
                    attributes
                        .iter()
                        .filter(|(k, _)| !banned(k))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Like [`sanitize_for_compare`], and also drops fields never valid in a
/// write body (`id`, `type`, `relationships`).
pub fn sanitize_for_write<S: AsRef<str>>(resource: &Resource, banlist: &[S]) -> Resource {
    let mut sanitized = sanitize_for_compare(resource, banlist);
    for field in STRUCTURAL_FIELDS {
        sanitized.remove(*field);
    }
    sanitized
}

//! Normalizer
//!
//! Produces a canonical value: map keys in lexicographic order at every
//! depth and, unless the kind opts out, sequences in a stable sorted order.
//! Semantically identical payloads normalize to equal values regardless of
//! how the remote side ordered them.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Treat sequences as order-insensitive and sort them
    pub sort_arrays: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { sort_arrays: true }
    }
}

pub fn normalize(value: &Value, options: NormalizeOptions) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), normalize(inner, options));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => {
            let mut items: Vec<Value> = items.iter().map(|v| normalize(v, options)).collect();
            if options.sort_arrays {
                // Elements are already canonical, so their compact text is a total order
                items.sort_by_cached_key(|v| v.to_string());
            }
            Value::Array(items)
        }
        scalar => scalar.clone(),
    }
}

//! Property-based tests using proptest
//!
//! These tests check the purity and symmetry guarantees of the sanitizer,
//! normalizer, envelopes and diff engine over randomized resources.

use dd_backup::engine::{
    diff_values, normalize, sanitize_for_compare, sanitize_for_write, NormalizeOptions,
    SnapshotFormat, WorkerPool,
};
use dd_backup::resource::{Envelope, Resource};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const BANLIST: &[&str] = &["created_at", "modified_at", "last_executed_at"];

/// Generate arbitrary JSON scalars
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z][a-z0-9_]{0,19}".prop_map(Value::String),
    ]
}

/// Generate arbitrary nested JSON values
fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,10}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate resources that may carry volatile fields and attributes
fn arb_resource() -> impl Strategy<Value = Resource> {
    (
        "[a-z0-9]{3}-[a-z0-9]{3}-[a-z0-9]{3}",
        prop::collection::btree_map("[a-z_]{1,10}", arb_value(), 0..5),
        prop::collection::btree_map("[a-z_]{1,10}", arb_value(), 0..5),
        prop::option::of("2024-0[1-9]-0[1-9]T00:00:00Z"),
    )
        .prop_map(|(id, top, attributes, created)| {
            let mut resource: Resource = top.into_iter().collect();
            let mut attributes: Map<String, Value> = attributes.into_iter().collect();
            if let Some(ts) = created {
                resource.insert("created_at".into(), json!(ts));
                attributes.insert("modified_at".into(), json!(ts));
            }
            resource.insert("id".into(), json!(id));
            resource.insert("attributes".into(), Value::Object(attributes));
            resource
        })
}

proptest! {
    /// Sanitizing twice equals sanitizing once
    #[test]
    fn sanitize_for_compare_is_idempotent(resource in arb_resource()) {
        let once = sanitize_for_compare(&resource, BANLIST);
        let twice = sanitize_for_compare(&once, BANLIST);
        prop_assert_eq!(once, twice);
    }

    /// Banlisted fields never survive sanitizing
    #[test]
    fn sanitize_removes_banlisted_fields(resource in arb_resource()) {
        let clean = sanitize_for_compare(&resource, BANLIST);
        prop_assert!(!clean.contains_key("created_at"));
        let attributes = clean["attributes"].as_object().unwrap();
        prop_assert!(!attributes.contains_key("modified_at"));
    }

    /// Write bodies never carry the id
    #[test]
    fn sanitize_for_write_drops_id(resource in arb_resource()) {
        let clean = sanitize_for_write(&resource, BANLIST);
        prop_assert!(!clean.contains_key("id"));
        prop_assert!(!clean.contains_key("type"));
        prop_assert!(!clean.contains_key("relationships"));
    }

    /// Normalizing twice equals normalizing once
    #[test]
    fn normalize_is_idempotent(value in arb_value(), sort_arrays in any::<bool>()) {
        let options = NormalizeOptions { sort_arrays };
        let once = normalize(&value, options);
        prop_assert_eq!(normalize(&once, options), once);
    }

    /// Reversing every array does not change the normalized form
    #[test]
    fn normalize_ignores_array_order(items in prop::collection::vec(arb_value(), 0..8)) {
        let forward = Value::Array(items.clone());
        let backward = Value::Array(items.into_iter().rev().collect());
        let options = NormalizeOptions::default();
        prop_assert_eq!(normalize(&forward, options), normalize(&backward, options));
    }

    /// Rendering a normalized value is deterministic and parses back
    #[test]
    fn rendering_is_stable(resource in arb_resource()) {
        let view = normalize(&Value::Object(resource), NormalizeOptions::default());
        for format in [SnapshotFormat::Json, SnapshotFormat::Yaml] {
            let first = format.render(&view).unwrap();
            let second = format.render(&view).unwrap();
            prop_assert_eq!(&first, &second);
            let parsed = format.parse(&first, std::path::Path::new("x")).unwrap();
            prop_assert_eq!(normalize(&parsed, NormalizeOptions::default()), view.clone());
        }
    }

    /// Unwrapping a wrapped resource gives it back
    #[test]
    fn envelope_unwrap_inverts_wrap(resource in arb_resource(), key in prop::option::of("[a-z]{1,8}")) {
        let envelope = Envelope::from_key(key.as_deref());
        let clean = sanitize_for_write(&resource, BANLIST);
        let wrapped = envelope.wrap(clean.clone());
        prop_assert_eq!(envelope.unwrap(wrapped).unwrap(), clean);
    }

    /// Resources differing only in banlisted fields compare equal
    #[test]
    fn banlisted_differences_are_invisible(resource in arb_resource(), ts in "20[0-9]{2}-01-01") {
        let mut touched = resource.clone();
        touched.insert("last_executed_at".into(), json!(ts));
        let options = NormalizeOptions::default();
        let a = normalize(&Value::Object(sanitize_for_compare(&resource, BANLIST)), options);
        let b = normalize(&Value::Object(sanitize_for_compare(&touched, BANLIST)), options);
        prop_assert_eq!(diff_values(&a, &b).unwrap(), "");
    }

    /// Diffs only contain context, removal and addition lines
    #[test]
    fn diff_lines_are_prefixed(a in arb_value(), b in arb_value()) {
        let diff = diff_values(&a, &b).unwrap();
        if a == b {
            prop_assert!(diff.is_empty());
        }
        for line in diff.lines() {
            prop_assert!(line.starts_with(' ') || line.starts_with('-') || line.starts_with('+'));
        }
    }

    /// Every submitted item is processed exactly once
    #[test]
    fn worker_pool_runs_every_task(items in prop::collection::vec(any::<u32>(), 0..40), workers in 1usize..8) {
        let pool = WorkerPool::new(workers);
        let results = tokio_test::block_on(pool.run(items.clone(), |n| async move { n }));
        let values: Vec<u32> = results.into_iter().map(|r| r.unwrap()).collect();
        prop_assert_eq!(values, items);
    }
}

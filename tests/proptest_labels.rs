//! Property-Based Tests - Label Schema Invariants
//!
//! Uses `proptest` to check schema extraction and rendering across
//! random label names, values and declaration orders.

use std::collections::HashSet;

use proptest::prelude::*;

use promgroup::adapters::metrics::builders::abs_error;
use promgroup::{label_set, LabelError, LabelKind, LabelSchema, Meta, SchemaBuilder};

label_set! {
    struct Mixed {
        #[meta(label = "name", default = "anonymous")]
        name: String,
        #[meta(label = "enabled", default = "unset")]
        enabled: bool,
        #[meta(label = "shard")]
        shard: i64,
    }
}

fn label_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

// ── Schema Builder Properties ───────────────────────────────

proptest! {
    /// Descriptor order is declaration order, whatever the names.
    #[test]
    fn schema_preserves_declaration_order(
        names in prop::collection::hash_set(label_name(), 1..12),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let mut builder = SchemaBuilder::new();
        for name in &names {
            let meta = [("label", name.as_str())];
            builder.scalar(name, &Meta::new(&meta), LabelKind::String).unwrap();
        }

        prop_assert_eq!(builder.finish().names(), names);
    }

    /// The set of extracted names does not depend on declaration order.
    #[test]
    fn schema_name_set_ignores_order(
        (names, shuffled) in prop::collection::hash_set(label_name(), 1..12)
            .prop_map(|names| names.into_iter().collect::<Vec<_>>())
            .prop_flat_map(|names| (Just(names.clone()), Just(names).prop_shuffle())),
    ) {
        let extract = |names: &[String]| {
            let mut builder = SchemaBuilder::new();
            for name in names {
                let meta = [("label", name.as_str())];
                builder.scalar(name, &Meta::new(&meta), LabelKind::Bool).unwrap();
            }
            builder.finish().names().into_iter().collect::<HashSet<_>>()
        };

        prop_assert_eq!(extract(&names), extract(&shuffled));
    }

    /// A label name declared twice is always rejected, at its second use.
    #[test]
    fn schema_rejects_repeated_names(
        names in prop::collection::vec(label_name(), 2..12),
    ) {
        let mut builder = SchemaBuilder::new();
        let mut seen = HashSet::new();
        let mut failed_at = None;

        for (i, name) in names.iter().enumerate() {
            let meta = [("label", name.as_str())];
            match builder.scalar(name, &Meta::new(&meta), LabelKind::Int) {
                Ok(()) => prop_assert!(seen.insert(name.clone())),
                Err(LabelError::DuplicateLabel { label }) => {
                    prop_assert!(seen.contains(&label));
                    failed_at = Some(i);
                    break;
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }

        let first_repeat = names
            .iter()
            .enumerate()
            .position(|(i, name)| names[..i].contains(name));
        prop_assert_eq!(failed_at, first_repeat);
    }
}

// ── Rendering Properties ────────────────────────────────────

proptest! {
    /// Non-zero values render verbatim; zero values take the default
    /// when one is declared.
    #[test]
    fn render_substitutes_defaults_only_for_zero_values(
        name in "[a-zA-Z0-9]{0,8}",
        enabled in any::<bool>(),
        shard in any::<i64>(),
    ) {
        let schema = LabelSchema::extract::<Mixed>().unwrap();
        let labels = Mixed { name: name.clone(), enabled, shard };
        let rendered = schema.render(&labels);

        let expected_name = if name.is_empty() { "anonymous".to_string() } else { name };
        let expected_enabled = if enabled { "true" } else { "unset" };
        prop_assert_eq!(rendered[0].as_ref(), expected_name.as_str());
        prop_assert_eq!(rendered[1].as_ref(), expected_enabled);
        prop_assert_eq!(rendered[2].as_ref(), shard.to_string());
    }

    /// Rendering yields one value per descriptor.
    #[test]
    fn render_matches_schema_length(shard in any::<i64>()) {
        let schema = LabelSchema::extract::<Mixed>().unwrap();
        let labels = Mixed { name: String::new(), enabled: false, shard };
        prop_assert_eq!(schema.render(&labels).len(), schema.len());
    }
}

// ── Objective Error Properties ──────────────────────────────

proptest! {
    /// The allowed error shrinks as the quantile grows and stays within
    /// [0, 0.1] for quantiles in [0, 1].
    #[test]
    fn abs_error_is_bounded_and_monotonic(q1 in 0.0f64..=1.0, delta in 0.0f64..=1.0) {
        let q2 = (q1 + delta).min(1.0);
        let (e1, e2) = (abs_error(q1), abs_error(q2));
        prop_assert!((0.0..=0.1).contains(&e1), "abs_error({q1}) = {e1}");
        prop_assert!(e2 <= e1, "abs_error({q2}) = {e2} > abs_error({q1}) = {e1}");
    }
}

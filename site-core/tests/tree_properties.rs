//! Property-based tests for the element tree.
//!
//! Random edit sequences must never break the structural invariants:
//! - ids stay unique and every type stays registered
//! - leaf types never gain children
//! - failed operations leave the tree untouched
//! - the JSON document form round-trips losslessly

use proptest::prelude::*;
use serde_json::json;
use site_core::resolve::resolve_props;
use site_core::{ComponentRegistry, Element, ElementTree, Props, SiteDocument, Viewport};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

const KINDS: [&str; 8] = [
    "section", "row", "column", "grid", "heading", "text", "button", "image",
];

#[derive(Debug, Clone)]
enum Op {
    Insert { parent: usize, kind: usize, index: usize },
    Remove { target: usize },
    Update { target: usize, value: i64 },
    Override { target: usize, viewport: usize, value: i64 },
    Move { target: usize, parent: usize, index: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<usize>(), 0..KINDS.len(), 0usize..4)
            .prop_map(|(parent, kind, index)| Op::Insert { parent, kind, index }),
        1 => any::<usize>().prop_map(|target| Op::Remove { target }),
        1 => (any::<usize>(), -5i64..20).prop_map(|(target, value)| Op::Update { target, value }),
        1 => (any::<usize>(), 0usize..3, -5i64..20)
            .prop_map(|(target, viewport, value)| Op::Override { target, viewport, value }),
        1 => (any::<usize>(), any::<usize>(), 0usize..4)
            .prop_map(|(target, parent, index)| Op::Move { target, parent, index }),
    ]
}

fn props(value: serde_json::Value) -> Props {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Props::new(),
    }
}

fn apply(tree: &ElementTree, registry: &ComponentRegistry, op: &Op) -> Option<ElementTree> {
    let ids = tree.ids();
    let pick = |n: usize| ids[n % ids.len()].clone();
    let result = match *op {
        Op::Insert { parent, kind, index } => registry
            .instantiate(KINDS[kind])
            .and_then(|element| tree.insert_child(registry, &pick(parent), element, index)),
        Op::Remove { target } => tree.remove_node(&pick(target)),
        Op::Update { target, value } => {
            tree.update_props(&pick(target), &props(json!({"columns": value})))
        }
        Op::Override { target, viewport, value } => tree.update_responsive_override(
            &pick(target),
            Viewport::ALL[viewport],
            &props(json!({"columns": value})),
        ),
        Op::Move { target, parent, index } => {
            tree.move_node(registry, &pick(target), &pick(parent), index)
        }
    };
    result.ok()
}

fn build(ops: &[Op]) -> ElementTree {
    let registry = ComponentRegistry::builtin();
    let mut tree = ElementTree::new(Element::with_id("root", "section")).expect("root");
    for op in ops {
        if let Some(next) = apply(&tree, registry, op) {
            tree = next;
        }
    }
    tree
}

// =============================================================================
// TREE PROPERTY TESTS
// =============================================================================

proptest! {
    /// Any sequence of edits yields a tree that passes validation.
    #[test]
    fn edits_preserve_invariants(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let tree = build(&ops);
        prop_assert!(tree.validate(ComponentRegistry::builtin()).is_ok());
        prop_assert_eq!(tree.ids().len(), tree.node_count());
    }

    /// A rejected edit never changes the source tree.
    #[test]
    fn failed_edits_are_side_effect_free(
        ops in prop::collection::vec(op_strategy(), 0..20),
        last in op_strategy(),
    ) {
        let tree = build(&ops);
        let before = tree.clone();
        let _ = apply(&tree, ComponentRegistry::builtin(), &last);
        prop_assert_eq!(tree, before);
    }

    /// Serialize then deserialize reproduces the same tree.
    #[test]
    fn document_round_trip(ops in prop::collection::vec(op_strategy(), 0..30)) {
        let tree = build(&ops);
        let doc = SiteDocument::from_tree("prop-site", &tree, 1);
        let parsed = SiteDocument::from_json(&doc.to_json().expect("serialize")).expect("parse");
        prop_assert_eq!(parsed.into_tree().expect("tree"), tree.clone());
        prop_assert_eq!(ElementTree::from_json(&tree.to_json().expect("json")).expect("tree"), tree);
    }

    /// Mobile resolution never sees tablet overrides.
    #[test]
    fn overrides_are_independent(base in 1i64..12, tablet in 1i64..12) {
        let element = Element::with_id("r", "row")
            .with_prop("columns", base)
            .with_override(Viewport::Tablet, "columns", tablet);
        let descriptor = ComponentRegistry::builtin().resolve("row").expect("row");
        prop_assert_eq!(
            resolve_props(&element, descriptor, Viewport::Mobile)["columns"].clone(),
            json!(base)
        );
        prop_assert_eq!(
            resolve_props(&element, descriptor, Viewport::Tablet)["columns"].clone(),
            json!(tablet)
        );
    }
}

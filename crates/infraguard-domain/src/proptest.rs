//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Evaluation determinism (repeat runs, sequential vs parallel)
//! - `exists` / `not_exists` complementarity
//! - Policy render/parse round-trips
//! - The attribute-path compiler on arbitrary input

use crate::attr_path::AttributePath;
use crate::engine::{EngineOptions, evaluate_policies};
use crate::eval::{EvalOptions, Evaluator};
use crate::graph::{ResourceGraph, ResourceNode};
use crate::hooks::{CancellationToken, NoSuppression};
use crate::policy::{Policy, parse_policy_document};
use crate::test_support::{graph_of, node, policy};
use ::proptest::collection::vec;
use ::proptest::option;
use ::proptest::prelude::*;
use serde_json::{Value as JsonValue, json};

// ============================================================================
// Strategies
// ============================================================================

fn arb_scalar() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        any::<bool>().prop_map(JsonValue::from),
        (-5i64..5).prop_map(JsonValue::from),
        "[a-c]{0,2}".prop_map(JsonValue::from),
        Just(JsonValue::from("true")),
    ]
}

fn arb_attribute() -> impl Strategy<Value = &'static str> + Clone {
    prop_oneof![
        Just("a"),
        Just("b"),
        Just("c.d"),
        Just("list[*]"),
        Just("list.0"),
        Just("resource_type"),
    ]
}

fn arb_leaf() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        arb_attribute().prop_map(|a| json!({"attribute": a, "operator": "exists"})),
        arb_attribute().prop_map(|a| json!({"attribute": a, "operator": "not_exists"})),
        (arb_attribute(), arb_scalar())
            .prop_map(|(a, v)| json!({"attribute": a, "operator": "equals", "value": v})),
        (arb_attribute(), arb_scalar())
            .prop_map(|(a, v)| json!({"attribute": a, "operator": "not_equals", "value": v})),
        (arb_attribute(), vec(arb_scalar(), 1..3))
            .prop_map(|(a, v)| json!({"attribute": a, "operator": "within", "value": v})),
        (arb_attribute(), -3i64..6)
            .prop_map(|(a, n)| json!({"attribute": a, "operator": "greater_than", "value": n})),
        arb_attribute().prop_map(|a| json!({"attribute": a, "operator": "is_true"})),
        (prop_oneof![Just("t0"), Just("t1")], arb_attribute()).prop_map(|(t, a)| {
            json!({"resource_types": [t], "attribute": a, "operator": "is_not_empty"})
        }),
    ]
}

fn arb_definition() -> impl Strategy<Value = JsonValue> {
    arb_leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            vec(inner.clone(), 1..3).prop_map(|c| json!({"and": c})),
            vec(inner.clone(), 1..3).prop_map(|c| json!({"or": c})),
            (vec(inner.clone(), 1..3), any::<bool>())
                .prop_map(|(c, flag)| json!({"or": c, "collect_skipped_keys": flag})),
            inner.clone().prop_map(|c| json!({"not": c})),
            (
                inner,
                prop_oneof![Just("any"), Just("outgoing"), Just("incoming")]
            )
                .prop_map(|(f, d)| json!({"connection": {"direction": d}, "filter": f})),
        ]
    })
}

fn arb_attrs() -> impl Strategy<Value = JsonValue> {
    (
        option::of(arb_scalar()),
        option::of(arb_scalar()),
        option::of(any::<bool>()),
        vec(arb_scalar(), 0..3),
    )
        .prop_map(|(a, b, d, list)| {
            let mut map = serde_json::Map::new();
            if let Some(a) = a {
                map.insert("a".to_string(), a);
            }
            if let Some(b) = b {
                map.insert("b".to_string(), b);
            }
            if let Some(d) = d {
                map.insert("c".to_string(), json!({"d": d}));
            }
            map.insert("list".to_string(), JsonValue::Array(list));
            JsonValue::Object(map)
        })
}

fn node_id(i: usize) -> String {
    format!("t{}.n{i}", i % 2)
}

fn arb_graph() -> impl Strategy<Value = ResourceGraph> {
    (vec(arb_attrs(), 1..6), vec((0usize..6, 0usize..6), 0..8)).prop_map(|(attrs, edges)| {
        let nodes: Vec<ResourceNode> = attrs
            .into_iter()
            .enumerate()
            .map(|(i, a)| node(&node_id(i), &format!("t{}", i % 2), a))
            .collect();
        let count = nodes.len();
        let mut graph = graph_of(nodes, &[]);
        for (from, to) in edges {
            if from < count && to < count {
                graph
                    .add_edge(&node_id(from), &node_id(to), "ref")
                    .expect("edge between known nodes");
            }
        }
        graph
    })
}

fn document(definition: JsonValue) -> JsonValue {
    json!({
        "metadata": {"id": "PROP_1", "category": "general"},
        "definition": definition,
    })
}

fn run(
    graph: &ResourceGraph,
    policy: &Policy,
    parallel: bool,
) -> Vec<infraguard_types::CheckRecord> {
    evaluate_policies(
        graph,
        &[policy],
        &NoSuppression,
        &CancellationToken::new(),
        &EngineOptions {
            parallel,
            ..EngineOptions::default()
        },
    )
    .expect("not cancelled")
    .records
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Same (policy, graph) pair, same verdicts and evaluated keys; scheduling does not matter.
    #[test]
    fn evaluation_is_deterministic(graph in arb_graph(), definition in arb_definition()) {
        let policy = parse_policy_document(&document(definition)).expect("generated policy is valid");
        let first = run(&graph, &policy, false);
        let second = run(&graph, &policy, false);
        let parallel = run(&graph, &policy, true);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &parallel);
    }

    /// Rendering a parsed policy and parsing it again is the identity.
    #[test]
    fn render_parse_round_trip(definition in arb_definition()) {
        let policy = parse_policy_document(&document(definition)).expect("generated policy is valid");
        let again = parse_policy_document(&policy.to_document()).expect("rendered policy parses");
        prop_assert_eq!(policy, again);
    }

    /// `exists` and `not_exists` never agree, and an absent path never exists.
    #[test]
    fn exists_and_not_exists_are_complementary(
        attrs in arb_attrs(),
        path in prop_oneof![Just("a"), Just("zz"), Just("c.d"), Just("list[*]"), Just("list.0")],
    ) {
        let graph = graph_of(vec![node("t0.n0", "t0", attrs)], &[]);
        let handle = graph.handle_of("t0.n0").expect("node");
        let evaluator = Evaluator::new(&graph, EvalOptions::default());

        let exists = evaluator.evaluate(
            &policy(&format!("definition: {{attribute: '{path}', operator: exists}}")),
            handle,
        );
        let not_exists = evaluator.evaluate(
            &policy(&format!("definition: {{attribute: '{path}', operator: not_exists}}")),
            handle,
        );
        prop_assert_ne!(exists.result, not_exists.result);
        prop_assert_eq!(&exists.evaluated_keys, &not_exists.evaluated_keys);
        if path == "zz" {
            prop_assert!(!exists.result);
        }
    }

    /// The path compiler rejects or accepts; it never panics.
    #[test]
    fn attribute_path_parse_never_panics(raw in ".{0,24}") {
        let _ = AttributePath::parse(&raw);
    }

    /// Canonical form of any compiled path compiles back to the same path.
    #[test]
    fn canonical_paths_reparse(
        raw in "[a-z]{1,3}(\\.[a-z0-9*]{1,3}|\\[[0-9]\\]|\\[\\*\\]|\\[\"[a-z.']{0,3}\"\\]|\\['[a-z.\"]{0,3}'\\]){0,4}",
    ) {
        let path = AttributePath::parse(&raw).expect("generated path is well formed");
        let again = AttributePath::parse(&path.to_string()).expect("canonical form parses");
        prop_assert_eq!(path, again);
    }
}

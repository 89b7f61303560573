//! Evaluates one policy against one node of a [`ResourceGraph`].
//!
//! The evaluator is a pure function of (graph, policy, node, options). Every attribute
//! path it consults lands in the evaluated-keys set, including paths that were absent.

use crate::compare;
use crate::graph::{NodeHandle, ResourceGraph};
use crate::policy::{
    ConnectionCondition, FilterCondition, LogicalCombinator, LogicalOp, Policy, PolicyNode,
    types_match,
};
use crate::value::AttributeValue;
use infraguard_types::ids::ATTR_RESOURCE_TYPE;
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// Default for combinators that do not say whether children skipped by
    /// short-circuiting still contribute evaluated keys.
    pub collect_skipped_keys: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub result: bool,
    pub evaluated_keys: BTreeSet<String>,
}

pub struct Evaluator<'g> {
    graph: &'g ResourceGraph,
    options: EvalOptions,
}

impl<'g> Evaluator<'g> {
    pub fn new(graph: &'g ResourceGraph, options: EvalOptions) -> Self {
        Self { graph, options }
    }

    pub fn evaluate(&self, policy: &Policy, handle: NodeHandle) -> Evaluation {
        let mut keys = BTreeSet::new();
        let result = self.eval(policy.definition(), handle, &mut keys);
        Evaluation {
            result,
            evaluated_keys: keys,
        }
    }

    /// Recursion follows the policy tree, not the graph, so cycles in the graph cannot
    /// make it loop.
    fn eval(&self, node: &PolicyNode, at: NodeHandle, keys: &mut BTreeSet<String>) -> bool {
        match node {
            PolicyNode::Filter(filter) => self.eval_filter(filter, at, keys),
            PolicyNode::Logical(logical) => self.eval_logical(logical, at, keys),
            PolicyNode::Connection(conn) => self.eval_connection(conn, at, keys),
        }
    }

    fn eval_filter(
        &self,
        filter: &FilterCondition,
        at: NodeHandle,
        keys: &mut BTreeSet<String>,
    ) -> bool {
        let resource = self.graph.node(at);
        if !types_match(&filter.resource_types, &resource.resource_type) {
            return false;
        }

        let pseudo;
        let mut values: Vec<&AttributeValue> = Vec::new();
        let matches = filter.attribute.resolve(&resource.attributes);
        if matches.is_empty() {
            let raw = filter.attribute.to_string();
            if raw == ATTR_RESOURCE_TYPE {
                pseudo = AttributeValue::String(resource.resource_type.clone());
                values.push(&pseudo);
            }
            keys.insert(raw);
        } else {
            for m in matches {
                keys.insert(m.path);
                values.push(m.value);
            }
        }

        compare::apply(filter.operator, &filter.operand, &values)
    }

    fn eval_logical(
        &self,
        logical: &LogicalCombinator,
        at: NodeHandle,
        keys: &mut BTreeSet<String>,
    ) -> bool {
        let collect_skipped = logical
            .collect_skipped_keys
            .unwrap_or(self.options.collect_skipped_keys);

        let short_circuit_on = match logical.op {
            LogicalOp::Not => {
                return logical
                    .children
                    .first()
                    .is_some_and(|child| !self.eval(child, at, keys));
            }
            LogicalOp::And => false,
            LogicalOp::Or => true,
        };

        for (i, child) in logical.children.iter().enumerate() {
            if self.eval(child, at, keys) == short_circuit_on {
                if collect_skipped {
                    for skipped in &logical.children[i + 1..] {
                        self.eval(skipped, at, keys);
                    }
                }
                return short_circuit_on;
            }
        }
        !short_circuit_on
    }

    /// Existential: true as soon as one eligible neighbor satisfies the nested filter.
    fn eval_connection(
        &self,
        conn: &ConnectionCondition,
        at: NodeHandle,
        keys: &mut BTreeSet<String>,
    ) -> bool {
        for (neighbor, resource, label) in self.graph.neighbors(at, conn.direction) {
            if !types_match(&conn.resource_types, &resource.resource_type) {
                continue;
            }
            if conn.label.as_deref().is_some_and(|wanted| wanted != label) {
                continue;
            }

            if self.eval(&conn.filter, neighbor, keys) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{graph_of, node, policy};
    use serde_json::json;

    fn keys(e: &Evaluation) -> Vec<&str> {
        e.evaluated_keys.iter().map(String::as_str).collect()
    }

    fn run(graph: &ResourceGraph, policy: &Policy, id: &str) -> Evaluation {
        let handle = graph.handle_of(id).expect("node");
        Evaluator::new(graph, EvalOptions::default()).evaluate(policy, handle)
    }

    #[test]
    fn equals_encrypted_true() {
        let graph = graph_of(
            vec![
                node("aws_ebs_volume.a", "aws_ebs_volume", json!({"encrypted": false})),
                node("aws_ebs_volume.b", "aws_ebs_volume", json!({"encrypted": true})),
            ],
            &[],
        );
        let p = policy("definition: {attribute: encrypted, operator: equals, value: true}");

        let a = run(&graph, &p, "aws_ebs_volume.a");
        let b = run(&graph, &p, "aws_ebs_volume.b");
        assert!(!a.result);
        assert!(b.result);
        assert_eq!(keys(&a), vec!["encrypted"]);
        assert_eq!(keys(&b), vec!["encrypted"]);
    }

    #[test]
    fn exists_and_not_exists_on_absent_attribute() {
        let graph = graph_of(vec![node("aws_ebs_volume.a", "aws_ebs_volume", json!({}))], &[]);
        let exists = policy("definition: {attribute: kms_key_id, operator: exists}");
        let not_exists = policy("definition: {attribute: kms_key_id, operator: not_exists}");

        let e = run(&graph, &exists, "aws_ebs_volume.a");
        assert!(!e.result);
        assert_eq!(keys(&e), vec!["kms_key_id"]);
        assert!(run(&graph, &not_exists, "aws_ebs_volume.a").result);
    }

    #[test]
    fn wildcard_records_every_concrete_match() {
        let graph = graph_of(
            vec![node(
                "aws_security_group.sg",
                "aws_security_group",
                json!({"ingress": [{"from_port": 22}, {"from_port": 443}]}),
            )],
            &[],
        );
        let p = policy("definition: {attribute: 'ingress[*].from_port', operator: not_equals, value: 22}");
        let e = run(&graph, &p, "aws_security_group.sg");
        assert!(!e.result);
        assert_eq!(keys(&e), vec!["ingress.0.from_port", "ingress.1.from_port"]);
    }

    #[test]
    fn flattened_attribute_keys_are_matched() {
        let graph = graph_of(
            vec![
                node("x.flat", "x", json!({"encryption.enabled": true})),
                node("x.nested", "x", json!({"encryption": {"enabled": false}})),
            ],
            &[],
        );
        let p = policy("definition: {attribute: encryption.enabled, operator: equals, value: true}");
        let flat = run(&graph, &p, "x.flat");
        assert!(flat.result);
        assert_eq!(keys(&flat), vec!["encryption.enabled"]);
        assert!(!run(&graph, &p, "x.nested").result);
    }

    #[test]
    fn and_short_circuits_on_first_false() {
        let graph = graph_of(vec![node("x.a", "x", json!({"a": false, "b": true}))], &[]);
        let p = policy(
            r#"
definition:
  and:
    - {attribute: a, operator: is_true}
    - {attribute: b, operator: is_true}
"#,
        );
        let e = run(&graph, &p, "x.a");
        assert!(!e.result);
        assert_eq!(keys(&e), vec!["a"]);
    }

    #[test]
    fn or_short_circuits_on_first_true() {
        let graph = graph_of(vec![node("x.a", "x", json!({"a": true, "b": false}))], &[]);
        let p = policy(
            r#"
definition:
  or:
    - {attribute: a, operator: is_true}
    - {attribute: b, operator: is_true}
"#,
        );
        let e = run(&graph, &p, "x.a");
        assert!(e.result);
        assert_eq!(keys(&e), vec!["a"]);
    }

    #[test]
    fn skip_if_guard_keeps_collecting_keys() {
        let graph = graph_of(vec![node("x.a", "x", json!({"a": false}))], &[]);
        let p = policy(
            r#"
definition:
  and:
    - {attribute: a, operator: is_true}
    - {attribute: b, operator: exists}
  collect_skipped_keys: true
"#,
        );
        let e = run(&graph, &p, "x.a");
        assert!(!e.result);
        assert_eq!(keys(&e), vec!["a", "b"]);

        let handle = graph.handle_of("x.a").expect("node");
        let plain = policy(
            "definition: {and: [{attribute: a, operator: is_true}, {attribute: c, operator: exists}]}",
        );
        let opts = EvalOptions {
            collect_skipped_keys: true,
        };
        let e = Evaluator::new(&graph, opts).evaluate(&plain, handle);
        assert_eq!(keys(&e), vec!["a", "c"]);
    }

    #[test]
    fn not_negates_its_child() {
        let graph = graph_of(vec![node("x.a", "x", json!({"public": true}))], &[]);
        let p = policy("definition: {not: {attribute: public, operator: is_true}}");
        let e = run(&graph, &p, "x.a");
        assert!(!e.result);
        assert_eq!(keys(&e), vec!["public"]);
    }

    #[test]
    fn filter_leaf_for_another_kind_is_false_without_keys() {
        let graph = graph_of(vec![node("x.a", "x", json!({"a": 1}))], &[]);
        let p = policy("definition: {resource_types: [y], attribute: a, operator: exists}");
        let e = run(&graph, &p, "x.a");
        assert!(!e.result);
        assert!(e.evaluated_keys.is_empty());
    }

    #[test]
    fn outgoing_connection_is_existential() {
        let graph = graph_of(
            vec![
                node("a.a", "a", json!({})),
                node("b.b", "b", json!({"type": "key"})),
                node("c.c", "c", json!({"type": "other"})),
            ],
            &[("a.a", "c.c", "x"), ("a.a", "b.b", "kms_key_id")],
        );
        let p = policy(
            r#"
definition:
  connection: {direction: outgoing}
  filter: {attribute: type, operator: equals, value: key}
"#,
        );
        assert!(run(&graph, &p, "a.a").result);
        assert!(!run(&graph, &p, "b.b").result);
        let e = run(&graph, &p, "c.c");
        assert!(!e.result);
        assert!(e.evaluated_keys.is_empty());
    }

    #[test]
    fn connection_filters_by_kind_label_and_pseudo_type() {
        let graph = graph_of(
            vec![
                node("aws_instance.web", "aws_instance", json!({})),
                node("aws_kms_key.k", "aws_kms_key", json!({"enable_key_rotation": true})),
            ],
            &[("aws_instance.web", "aws_kms_key.k", "kms_key_id")],
        );
        let by_type = policy(
            r#"
definition:
  connection: {direction: any}
  filter: {attribute: resource_type, operator: equals, value: aws_kms_key}
"#,
        );
        let e = run(&graph, &by_type, "aws_instance.web");
        assert!(e.result);
        assert_eq!(keys(&e), vec!["resource_type"]);

        let wrong_label = policy(
            r#"
definition:
  connection: {direction: outgoing, resource_type: aws_kms_key, label: ebs_kms_key_id}
  filter: {attribute: enable_key_rotation, operator: is_true}
"#,
        );
        assert!(!run(&graph, &wrong_label, "aws_instance.web").result);

        let incoming = policy(
            r#"
definition:
  connection: {direction: incoming, resource_type: aws_instance}
  filter: {attribute: resource_type, operator: exists}
"#,
        );
        assert!(run(&graph, &incoming, "aws_kms_key.k").result);
    }

    #[test]
    fn nested_connections_can_return_to_the_origin() {
        let graph = graph_of(
            vec![
                node("x.a", "x", json!({"public": true})),
                node("y.b", "y", json!({})),
            ],
            &[("x.a", "y.b", "r")],
        );
        let p = policy(
            r#"
definition:
  connection: {direction: outgoing}
  filter:
    connection: {direction: incoming}
    filter: {attribute: public, operator: is_true}
"#,
        );
        let e = run(&graph, &p, "x.a");
        assert!(e.result);
        assert_eq!(keys(&e), vec!["public"]);
        assert!(!run(&graph, &p, "y.b").result);
    }

    #[test]
    fn nested_connections_terminate_on_cycles() {
        let graph = graph_of(
            vec![node("n.a", "n", json!({})), node("n.b", "n", json!({}))],
            &[("n.a", "n.b", "r"), ("n.b", "n.a", "r")],
        );
        let p = policy(
            r#"
definition:
  connection: {direction: any}
  filter:
    connection: {direction: any}
    filter: {attribute: resource_type, operator: exists}
"#,
        );
        assert!(run(&graph, &p, "n.a").result);
        assert!(run(&graph, &p, "n.b").result);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let graph = graph_of(
            vec![node("x.a", "x", json!({"tags": {"b": "1", "a": "2"}}))],
            &[],
        );
        let p = policy("definition: {attribute: 'tags.*', operator: not_equals, value: '3'}");
        let first = run(&graph, &p, "x.a");
        let second = run(&graph, &p, "x.a");
        assert_eq!(first, second);
        assert_eq!(keys(&first), vec!["tags.a", "tags.b"]);
    }
}

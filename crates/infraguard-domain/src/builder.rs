//! Builds a [`ResourceGraph`] from normalized resource definitions.
//!
//! Pass 1 inserts every node so references resolve regardless of declaration order.
//! Pass 2 resolves reference expressions into edges; anything that does not resolve is
//! reported back, never fatal.

use crate::graph::{GraphStructureError, NodeHandle, ResourceGraph, ResourceNode};
use crate::value::AttributeValue;
use infraguard_types::SourceLocation;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Normalized resource as produced by an external source-dialect parser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub references: Vec<RawReference>,
    #[serde(default, rename = "source", skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

/// A raw reference expression plus the attribute that holds it.
///
/// Bare strings are accepted on input; the holding attribute is then inferred from the
/// attribute tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawReferenceRepr")]
pub struct RawReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub expression: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReferenceRepr {
    Bare(String),
    Full {
        #[serde(default)]
        attribute: Option<String>,
        expression: String,
    },
}

impl From<RawReferenceRepr> for RawReference {
    fn from(value: RawReferenceRepr) -> Self {
        match value {
            RawReferenceRepr::Bare(expression) => RawReference {
                attribute: None,
                expression,
            },
            RawReferenceRepr::Full {
                attribute,
                expression,
            } => RawReference {
                attribute,
                expression,
            },
        }
    }
}

impl RawReference {
    pub fn new(attribute: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            expression: expression.into(),
        }
    }

    pub fn bare(expression: impl Into<String>) -> Self {
        Self {
            attribute: None,
            expression: expression.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Kinds that only carry values copied from elsewhere (locals, variables, outputs).
    /// Edges are attributed through them to the resource they ultimately name.
    pub passthrough_types: BTreeSet<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            passthrough_types: ["locals", "variable", "output"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    NoMatchingResource,
    SelfReference,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    pub from_id: String,
    pub attribute: String,
    pub expression: String,
    pub reason: UnresolvedReason,
}

#[derive(Clone, Debug)]
pub struct BuildOutput {
    pub graph: ResourceGraph,
    pub unresolved: Vec<UnresolvedReference>,
}

pub fn build_graph(
    definitions: Vec<ResourceDefinition>,
    options: &BuildOptions,
) -> Result<BuildOutput, GraphStructureError> {
    let mut graph = ResourceGraph::new();
    let mut references: Vec<Vec<RawReference>> = Vec::with_capacity(definitions.len());

    for def in definitions {
        graph.add_node(ResourceNode {
            id: def.id,
            resource_type: def.resource_type,
            attributes: def.attributes,
            source_location: def.source_location,
        })?;
        references.push(def.references);
    }

    let mut unresolved = Vec::new();
    let mut seen_edges: HashSet<(NodeHandle, NodeHandle, String)> = HashSet::new();
    let mut pending: Vec<(NodeHandle, NodeHandle, String)> = Vec::new();

    for (from, node) in graph.nodes() {
        for reference in &references[from.index()] {
            let label = reference
                .attribute
                .clone()
                .or_else(|| infer_attribute(&node.attributes, &reference.expression))
                .unwrap_or_default();

            let Some(target) = resolve_expression(&graph, &reference.expression) else {
                unresolved.push(UnresolvedReference {
                    from_id: node.id.clone(),
                    attribute: label,
                    expression: reference.expression.clone(),
                    reason: UnresolvedReason::NoMatchingResource,
                });
                continue;
            };
            if target == from {
                unresolved.push(UnresolvedReference {
                    from_id: node.id.clone(),
                    attribute: label,
                    expression: reference.expression.clone(),
                    reason: UnresolvedReason::SelfReference,
                });
                continue;
            }

            let mut visited = HashSet::from([from]);
            for ultimate in ultimate_targets(&graph, &references, target, options, &mut visited) {
                if ultimate == from {
                    continue;
                }
                let key = (from, ultimate, label.clone());
                if seen_edges.insert(key.clone()) {
                    pending.push(key);
                }
            }
        }
    }

    for (from, to, label) in pending {
        graph.add_edge_between(from, to, label);
    }

    for u in &unresolved {
        warn!(
            "unresolved reference {} in {} ({}): {:?}",
            u.expression, u.from_id, u.attribute, u.reason
        );
    }
    debug!(
        "built resource graph: {} nodes, {} edges, {} unresolved references",
        graph.node_count(),
        graph.edge_count(),
        unresolved.len()
    );

    Ok(BuildOutput { graph, unresolved })
}

/// Resolve a raw reference expression to the node whose id is the longest dotted prefix.
///
/// Accepts `${...}` interpolation wrappers and index selectors (`aws_subnet.a[0].id`).
pub fn resolve_expression(graph: &ResourceGraph, expression: &str) -> Option<NodeHandle> {
    let mut expr = expression.trim();
    if let Some(inner) = expr.strip_prefix("${").and_then(|e| e.strip_suffix('}')) {
        expr = inner.trim();
    }
    if expr.is_empty() {
        return None;
    }

    let segments: Vec<String> = expr
        .split('.')
        .map(|s| match s.find('[') {
            Some(pos) => s[..pos].to_string(),
            None => s.to_string(),
        })
        .collect();

    (1..=segments.len())
        .rev()
        .find_map(|n| graph.handle_of(&segments[..n].join(".")))
}

/// Follow pass-through nodes to the resources they copy values from.
fn ultimate_targets(
    graph: &ResourceGraph,
    references: &[Vec<RawReference>],
    start: NodeHandle,
    options: &BuildOptions,
    visited: &mut HashSet<NodeHandle>,
) -> Vec<NodeHandle> {
    if !options
        .passthrough_types
        .contains(&graph.node(start).resource_type)
    {
        return vec![start];
    }
    if !visited.insert(start) {
        return Vec::new();
    }

    let mut out: Vec<NodeHandle> = Vec::new();
    for reference in &references[start.index()] {
        let Some(next) = resolve_expression(graph, &reference.expression) else {
            continue;
        };
        if visited.contains(&next) {
            continue;
        }
        for t in ultimate_targets(graph, references, next, options, visited) {
            if !out.contains(&t) {
                out.push(t);
            }
        }
    }

    if out.is_empty() {
        out.push(start);
    }
    out
}

/// First attribute path (in key order) whose string value mentions `expression`.
fn infer_attribute(
    attributes: &BTreeMap<String, AttributeValue>,
    expression: &str,
) -> Option<String> {
    fn search(value: &AttributeValue, path: String, needle: &str) -> Option<String> {
        match value {
            AttributeValue::String(s) if s.contains(needle) => Some(path),
            AttributeValue::List(items) => items
                .iter()
                .enumerate()
                .find_map(|(i, v)| search(v, format!("{path}.{i}"), needle)),
            AttributeValue::Map(map) => map
                .iter()
                .find_map(|(k, v)| search(v, format!("{path}.{k}"), needle)),
            _ => None,
        }
    }

    let needle = expression.trim();
    if needle.is_empty() {
        return None;
    }
    attributes
        .iter()
        .find_map(|(k, v)| search(v, k.clone(), needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Direction;
    use serde_json::json;

    fn def(id: &str, ty: &str, refs: Vec<RawReference>) -> ResourceDefinition {
        ResourceDefinition {
            id: id.to_string(),
            resource_type: ty.to_string(),
            attributes: BTreeMap::new(),
            references: refs,
            source_location: None,
        }
    }

    fn out_ids(graph: &ResourceGraph, id: &str) -> Vec<(String, String)> {
        graph
            .neighbors_of(id, Direction::Outgoing)
            .map(|(n, l)| (n.id.clone(), l.to_string()))
            .collect()
    }

    #[test]
    fn references_resolve_regardless_of_declaration_order() {
        let defs = vec![
            def(
                "aws_ebs_volume.data",
                "aws_ebs_volume",
                vec![RawReference::new("kms_key_id", "aws_kms_key.main.arn")],
            ),
            def("aws_kms_key.main", "aws_kms_key", vec![]),
        ];
        let out = build_graph(defs, &BuildOptions::default()).expect("build");
        assert!(out.unresolved.is_empty());
        assert_eq!(
            out_ids(&out.graph, "aws_ebs_volume.data"),
            vec![("aws_kms_key.main".to_string(), "kms_key_id".to_string())]
        );
    }

    #[test]
    fn unresolved_references_are_reported_not_fatal() {
        let defs = vec![
            def(
                "aws_instance.web",
                "aws_instance",
                vec![
                    RawReference::new("subnet_id", "aws_subnet.missing.id"),
                    RawReference::new("self", "aws_instance.web.id"),
                ],
            ),
        ];
        let out = build_graph(defs, &BuildOptions::default()).expect("build");
        assert_eq!(out.graph.edge_count(), 0);
        assert_eq!(out.unresolved.len(), 2);
        assert_eq!(out.unresolved[0].reason, UnresolvedReason::NoMatchingResource);
        assert_eq!(out.unresolved[1].reason, UnresolvedReason::SelfReference);
    }

    #[test]
    fn duplicate_ids_abort_the_build() {
        let defs = vec![def("a.b", "a", vec![]), def("a.b", "a", vec![])];
        let err = build_graph(defs, &BuildOptions::default()).expect_err("duplicate");
        assert!(matches!(err, GraphStructureError::DuplicateId { .. }));
    }

    #[test]
    fn interpolation_and_index_selectors_resolve() {
        let mut graph = ResourceGraph::new();
        graph
            .add_node(ResourceNode::new("aws_subnet.a", "aws_subnet"))
            .expect("node");
        graph
            .add_node(ResourceNode::new(
                "data.aws_iam_policy_document.p",
                "aws_iam_policy_document",
            ))
            .expect("node");

        assert!(resolve_expression(&graph, "${aws_subnet.a[0].id}").is_some());
        assert!(resolve_expression(&graph, "data.aws_iam_policy_document.p.json").is_some());
        assert!(resolve_expression(&graph, "aws_subnet").is_none());
        assert!(resolve_expression(&graph, "${}").is_none());
    }

    #[test]
    fn passthrough_nodes_attribute_edges_to_the_ultimate_resource() {
        let defs = vec![
            def(
                "aws_s3_bucket.logs",
                "aws_s3_bucket",
                vec![RawReference::new("kms_master_key_id", "local.key_arn")],
            ),
            def(
                "local.key_arn",
                "locals",
                vec![RawReference::new("value", "var.key")],
            ),
            def(
                "var.key",
                "variable",
                vec![RawReference::new("default", "aws_kms_key.main.arn")],
            ),
            def("aws_kms_key.main", "aws_kms_key", vec![]),
        ];
        let out = build_graph(defs, &BuildOptions::default()).expect("build");
        assert_eq!(
            out_ids(&out.graph, "aws_s3_bucket.logs"),
            vec![("aws_kms_key.main".to_string(), "kms_master_key_id".to_string())]
        );
    }

    #[test]
    fn passthrough_without_onward_reference_keeps_edge_to_itself() {
        let defs = vec![
            def(
                "aws_s3_bucket.logs",
                "aws_s3_bucket",
                vec![RawReference::new("bucket", "local.name")],
            ),
            def("local.name", "locals", vec![]),
        ];
        let out = build_graph(defs, &BuildOptions::default()).expect("build");
        assert_eq!(
            out_ids(&out.graph, "aws_s3_bucket.logs"),
            vec![("local.name".to_string(), "bucket".to_string())]
        );
    }

    #[test]
    fn passthrough_cycles_terminate() {
        let defs = vec![
            def("aws_instance.a", "aws_instance", vec![RawReference::bare("local.x")]),
            def("local.x", "locals", vec![RawReference::bare("local.y")]),
            def("local.y", "locals", vec![RawReference::bare("local.x")]),
        ];
        let out = build_graph(defs, &BuildOptions::default()).expect("build");
        let targets: Vec<String> = out_ids(&out.graph, "aws_instance.a")
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(targets, vec!["local.y".to_string()]);
    }

    #[test]
    fn bare_references_infer_their_holding_attribute() {
        let mut web = def(
            "aws_instance.web",
            "aws_instance",
            vec![RawReference::bare("aws_security_group.sg.id")],
        );
        web.attributes = match AttributeValue::from(json!({
            "ami": "ami-123",
            "vpc_security_group_ids": ["${aws_security_group.sg.id}"]
        })) {
            AttributeValue::Map(m) => m,
            _ => unreachable!(),
        };
        let defs = vec![web, def("aws_security_group.sg", "aws_security_group", vec![])];
        let out = build_graph(defs, &BuildOptions::default()).expect("build");
        assert_eq!(
            out_ids(&out.graph, "aws_instance.web"),
            vec![(
                "aws_security_group.sg".to_string(),
                "vpc_security_group_ids.0".to_string()
            )]
        );
    }

    #[test]
    fn repeated_references_produce_one_edge_per_label() {
        let defs = vec![
            def(
                "aws_instance.web",
                "aws_instance",
                vec![
                    RawReference::new("kms_key_id", "aws_kms_key.k.arn"),
                    RawReference::new("kms_key_id", "aws_kms_key.k.id"),
                    RawReference::new("ebs_kms_key_id", "aws_kms_key.k.arn"),
                ],
            ),
            def("aws_kms_key.k", "aws_kms_key", vec![]),
        ];
        let out = build_graph(defs, &BuildOptions::default()).expect("build");
        assert_eq!(out.graph.edge_count(), 2);
    }

    #[test]
    fn definitions_deserialize_from_normalized_json() {
        let defs: Vec<ResourceDefinition> = serde_json::from_value(json!([
            {
                "id": "aws_s3_bucket.a",
                "type": "aws_s3_bucket",
                "attributes": {"acl": "private"},
                "references": ["aws_kms_key.k.arn", {"attribute": "policy", "expression": "data.x.y"}],
                "source": {"path": "main.tf", "start_line": 1, "end_line": 9}
            }
        ]))
        .expect("deserialize");
        assert_eq!(defs[0].references[0], RawReference::bare("aws_kms_key.k.arn"));
        assert_eq!(defs[0].references[1], RawReference::new("policy", "data.x.y"));
        assert_eq!(
            defs[0].source_location.as_ref().and_then(|l| l.end_line),
            Some(9)
        );
    }
}

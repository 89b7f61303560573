use crate::graph::{ResourceGraph, ResourceNode};
use crate::policy::{Policy, parse_policy_str};
use crate::value::AttributeValue;

pub fn node(id: &str, resource_type: &str, attributes: serde_json::Value) -> ResourceNode {
    let mut node = ResourceNode::new(id, resource_type);
    if let AttributeValue::Map(map) = AttributeValue::from(attributes) {
        node.attributes = map;
    }
    node
}

pub fn graph_of(nodes: Vec<ResourceNode>, edges: &[(&str, &str, &str)]) -> ResourceGraph {
    let mut graph = ResourceGraph::new();
    for n in nodes {
        graph.add_node(n).expect("add node");
    }
    for (from, to, label) in edges {
        graph.add_edge(from, to, *label).expect("add edge");
    }
    graph
}

/// Parse a policy from a document holding only `definition` (and optionally `scope`).
pub fn policy(body: &str) -> Policy {
    policy_with_id("TEST_1", body)
}

pub fn policy_with_id(id: &str, body: &str) -> Policy {
    let text = format!("metadata: {{id: {id}, category: general}}\n{body}\n");
    parse_policy_str(&text).expect("parse policy")
}

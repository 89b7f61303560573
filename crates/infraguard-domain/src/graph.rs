//! Write-once resource graph.
//!
//! Nodes live in an arena addressed by [`NodeHandle`]; edges are handle pairs with a label
//! naming the referencing attribute. Cycles are allowed; traversal code carries its own
//! visited set.

use crate::value::AttributeValue;
use infraguard_types::SourceLocation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphStructureError {
    #[error("duplicate resource id: {id}")]
    DuplicateId { id: String },

    #[error("edge {from} -> {to} references unknown node {missing}")]
    UnknownNode {
        from: String,
        to: String,
        missing: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Any,
    Outgoing,
    Incoming,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Direction::Any),
            "outgoing" => Some(Direction::Outgoing),
            "incoming" => Some(Direction::Incoming),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Any => "any",
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
        }
    }
}

/// One declared resource instance.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceNode {
    pub id: String,
    pub resource_type: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub source_location: Option<SourceLocation>,
}

impl ResourceNode {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: BTreeMap::new(),
            source_location: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// `from` references/depends-on `to`; `label` names the referencing attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeHandle,
    pub to: NodeHandle,
    pub label: String,
}

#[derive(Clone, Debug, Default)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<String, NodeHandle>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: ResourceNode) -> Result<NodeHandle, GraphStructureError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphStructureError::DuplicateId { id: node.id });
        }
        let handle = NodeHandle(self.nodes.len());
        self.index.insert(node.id.clone(), handle);
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        Ok(handle)
    }

    pub fn add_edge(
        &mut self,
        from_id: &str,
        to_id: &str,
        label: impl Into<String>,
    ) -> Result<(), GraphStructureError> {
        let unknown = |missing: &str| GraphStructureError::UnknownNode {
            from: from_id.to_string(),
            to: to_id.to_string(),
            missing: missing.to_string(),
        };
        let from = self.handle_of(from_id).ok_or_else(|| unknown(from_id))?;
        let to = self.handle_of(to_id).ok_or_else(|| unknown(to_id))?;
        self.add_edge_between(from, to, label.into());
        Ok(())
    }

    pub(crate) fn add_edge_between(&mut self, from: NodeHandle, to: NodeHandle, label: String) {
        let edge_idx = self.edges.len();
        self.edges.push(Edge { from, to, label });
        self.outgoing[from.0].push(edge_idx);
        self.incoming[to.0].push(edge_idx);
    }

    pub fn handle_of(&self, id: &str) -> Option<NodeHandle> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.handle_of(id).map(|h| &self.nodes[h.0])
    }

    pub fn node(&self, handle: NodeHandle) -> &ResourceNode {
        &self.nodes[handle.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &ResourceNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeHandle(i), n))
    }

    /// Handles sorted by node id, the order verdicts are reported in.
    pub fn handles_by_id(&self) -> Vec<NodeHandle> {
        let mut handles: Vec<NodeHandle> = (0..self.nodes.len()).map(NodeHandle).collect();
        handles.sort_by(|a, b| self.nodes[a.0].id.cmp(&self.nodes[b.0].id));
        handles
    }

    /// Neighbors of `handle` as `(node, label)` pairs, lazily.
    ///
    /// `Any` yields outgoing then incoming neighbors, each node at most once.
    pub fn neighbors(&self, handle: NodeHandle, direction: Direction) -> Neighbors<'_> {
        let (first, second): (&[usize], &[usize]) = match direction {
            Direction::Outgoing => (&self.outgoing[handle.0], &[]),
            Direction::Incoming => (&self.incoming[handle.0], &[]),
            Direction::Any => (&self.outgoing[handle.0], &self.incoming[handle.0]),
        };
        Neighbors {
            graph: self,
            origin: handle,
            first: first.iter(),
            second: second.iter(),
            dedup: matches!(direction, Direction::Any).then(HashSet::new),
        }
    }

    /// Same as [`ResourceGraph::neighbors`] addressed by id; unknown ids have no neighbors.
    pub fn neighbors_of(
        &self,
        id: &str,
        direction: Direction,
    ) -> impl Iterator<Item = (&ResourceNode, &str)> {
        self.handle_of(id)
            .into_iter()
            .flat_map(move |h| self.neighbors(h, direction).map(|(_, node, label)| (node, label)))
    }
}

pub struct Neighbors<'g> {
    graph: &'g ResourceGraph,
    origin: NodeHandle,
    first: std::slice::Iter<'g, usize>,
    second: std::slice::Iter<'g, usize>,
    dedup: Option<HashSet<NodeHandle>>,
}

impl<'g> Iterator for Neighbors<'g> {
    type Item = (NodeHandle, &'g ResourceNode, &'g str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let edge_idx = match self.first.next() {
                Some(idx) => *idx,
                None => *self.second.next()?,
            };
            let edge = &self.graph.edges[edge_idx];
            let other = if edge.from == self.origin {
                edge.to
            } else {
                edge.from
            };
            if let Some(seen) = self.dedup.as_mut()
                && !seen.insert(other)
            {
                continue;
            }
            return Some((other, &self.graph.nodes[other.0], edge.label.as_str()));
        }
    }
}

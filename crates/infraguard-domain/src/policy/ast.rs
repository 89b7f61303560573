use crate::attr_path::AttributePath;
use crate::graph::Direction;
use crate::policy::operator::Operator;
use crate::value::AttributeValue;
use infraguard_types::ids::RESOURCE_TYPE_ALL;
use infraguard_types::Severity;
use regex::Regex;
use std::collections::BTreeSet;

/// Reported alongside verdicts; never evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyMetadata {
    pub id: String,
    pub category: String,
    pub name: Option<String>,
    pub guideline: Option<String>,
    pub severity: Option<Severity>,
}

/// One compiled check.
#[derive(Clone, Debug, PartialEq)]
pub struct Policy {
    metadata: PolicyMetadata,
    scope: Option<Vec<String>>,
    definition: PolicyNode,
    targets: BTreeSet<String>,
}

impl Policy {
    pub fn new(
        metadata: PolicyMetadata,
        scope: Option<Vec<String>>,
        definition: PolicyNode,
    ) -> Self {
        let targets = match &scope {
            Some(types) => types.iter().cloned().collect(),
            None => {
                let mut out = BTreeSet::new();
                collect_leaf_types(&definition, &mut out);
                out
            }
        };
        Self {
            metadata,
            scope,
            definition,
            targets,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn category(&self) -> &str {
        &self.metadata.category
    }

    /// Display name, falling back to the id.
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or(&self.metadata.id)
    }

    pub fn metadata(&self) -> &PolicyMetadata {
        &self.metadata
    }

    /// Explicit `scope.resource_types`, if the document declared one.
    pub fn scope(&self) -> Option<&[String]> {
        self.scope.as_deref()
    }

    pub fn definition(&self) -> &PolicyNode {
        &self.definition
    }

    /// Resource kinds this policy produces verdicts for. Empty means every kind.
    pub fn targets(&self) -> &BTreeSet<String> {
        &self.targets
    }

    pub fn applies_to(&self, resource_type: &str) -> bool {
        types_match(&self.targets, resource_type)
    }
}

pub(crate) fn types_match<'a, I>(types: I, resource_type: &str) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    let mut any = false;
    for t in types {
        if t == RESOURCE_TYPE_ALL || t == resource_type {
            return true;
        }
        any = true;
    }
    !any
}

/// Union of filter-leaf kinds outside connection predicates.
fn collect_leaf_types(node: &PolicyNode, out: &mut BTreeSet<String>) {
    match node {
        PolicyNode::Filter(f) => out.extend(f.resource_types.iter().cloned()),
        PolicyNode::Logical(l) => {
            for child in &l.children {
                collect_leaf_types(child, out);
            }
        }
        PolicyNode::Connection(_) => {}
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PolicyNode {
    Filter(FilterCondition),
    Logical(LogicalCombinator),
    Connection(ConnectionCondition),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterCondition {
    /// Kinds this leaf applies to; on any other kind it evaluates to `false`. Empty means all.
    pub resource_types: Vec<String>,
    pub attribute: AttributePath,
    pub operator: Operator,
    pub operand: Operand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Not => "not",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogicalCombinator {
    pub op: LogicalOp,
    pub children: Vec<PolicyNode>,
    /// Keep collecting evaluated keys from children skipped by short-circuiting.
    /// `None` defers to the evaluator's default.
    pub collect_skipped_keys: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionCondition {
    pub direction: Direction,
    /// Neighbor kinds to consider. Empty means all.
    pub resource_types: Vec<String>,
    /// Only follow edges carrying this label.
    pub label: Option<String>,
    pub filter: Box<PolicyNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    None,
    Value(AttributeValue),
    List(Vec<AttributeValue>),
    Number(f64),
    Pattern(Pattern),
}

/// A regex compiled at parse time; equality is by source text.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

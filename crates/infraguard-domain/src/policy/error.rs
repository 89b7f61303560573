use crate::attr_path::AttributePathError;
use std::fmt;
use thiserror::Error;

/// A policy document that cannot become a [`crate::policy::Policy`].
///
/// Carries the policy id when the document got far enough to name one, so a batch
/// load can report the failure and move on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyParseError {
    pub policy_id: Option<String>,
    /// Location inside the document, e.g. `definition.and[1].operator`.
    pub at: String,
    pub kind: PolicyParseErrorKind,
}

impl PolicyParseError {
    pub(crate) fn new(
        policy_id: Option<String>,
        at: impl Into<String>,
        kind: PolicyParseErrorKind,
    ) -> Self {
        Self {
            policy_id,
            at: at.into(),
            kind,
        }
    }
}

impl fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = &self.policy_id {
            write!(f, "policy {id}: ")?;
        }
        if !self.at.is_empty() {
            write!(f, "{}: ", self.at)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for PolicyParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            PolicyParseErrorKind::InvalidPath(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyParseErrorKind {
    #[error("document is not valid YAML/JSON: {0}")]
    Syntax(String),

    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("unexpected key '{key}'")]
    UnexpectedKey { key: String },

    #[error("unknown operator '{name}'")]
    UnknownOperator { name: String },

    #[error("malformed attribute path: {0}")]
    InvalidPath(AttributePathError),

    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("inconsistent '{op}' combinator: {message}")]
    InconsistentCombinator { op: &'static str, message: String },

    #[error("definition node must be a filter, a combinator or a connection (keys: {keys})")]
    UnknownDefinition { keys: String },

    #[error("invalid connection direction '{value}' (expected any, outgoing or incoming)")]
    InvalidDirection { value: String },

    #[error("operator '{operator}' expects {expected}")]
    OperandMismatch {
        operator: &'static str,
        expected: &'static str,
    },

    #[error("invalid severity '{value}' (expected low, medium, high or critical)")]
    InvalidSeverity { value: String },
}

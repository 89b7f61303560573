//! Policy AST, document parser and renderer.

mod ast;
mod error;
mod operator;
mod parse;
mod render;

pub use ast::{
    ConnectionCondition, FilterCondition, LogicalCombinator, LogicalOp, Operand, Pattern, Policy,
    PolicyMetadata, PolicyNode,
};
pub(crate) use ast::types_match;
pub use error::{PolicyParseError, PolicyParseErrorKind};
pub use operator::{OperandKind, Operator};
pub use parse::{parse_policy_document, parse_policy_str};

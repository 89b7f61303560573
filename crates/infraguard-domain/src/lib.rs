//! Pure resource-graph construction and policy evaluation (no IO).
//!
//! Input: normalized resource definitions and parsed policy documents.
//! Output: per-resource verdicts with the attribute paths each verdict consulted.

#![forbid(unsafe_code)]

pub mod attr_path;
pub mod builder;
pub mod graph;
pub mod hooks;
pub mod policy;
pub mod report;
pub mod value;

mod compare;
mod engine;
mod eval;
mod fingerprint;

pub use compare::{loose_cmp, loose_eq};
pub use engine::{EngineOptions, EvaluationError, evaluate_policies};
pub use eval::{EvalOptions, Evaluation, Evaluator};
pub use fingerprint::fingerprint_for_record;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod proptest;

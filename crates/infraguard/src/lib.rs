//! Public facade over the infraguard engine.
//!
//! Embedders that already hold normalized resources and policy text depend on this crate
//! alone: build a graph, parse policies, evaluate.

#![forbid(unsafe_code)]

pub use infraguard_domain::attr_path::{AttributePath, AttributePathError};
pub use infraguard_domain::builder::{
    BuildOptions, BuildOutput, RawReference, ResourceDefinition, UnresolvedReason,
    UnresolvedReference, build_graph,
};
pub use infraguard_domain::graph::{
    Direction, Edge, GraphStructureError, NodeHandle, ResourceGraph, ResourceNode,
};
pub use infraguard_domain::hooks::{CancellationToken, NoSuppression, SuppressionHook};
pub use infraguard_domain::policy::{
    Operator, Policy, PolicyMetadata, PolicyParseError, PolicyParseErrorKind, parse_policy_document,
    parse_policy_str,
};
pub use infraguard_domain::report::{DomainReport, ResultCounts};
pub use infraguard_domain::value::AttributeValue;
pub use infraguard_domain::{
    EngineOptions, EvalOptions, Evaluation, EvaluationError, Evaluator, evaluate_policies,
};
pub use infraguard_types::{CheckRecord, CheckResult, Severity, SourceLocation};

/// Evaluate `policies` over `graph` sequentially, with no suppression and no cancellation.
pub fn evaluate(graph: &ResourceGraph, policies: &[&Policy]) -> DomainReport {
    match evaluate_policies(
        graph,
        policies,
        &NoSuppression,
        &CancellationToken::new(),
        &EngineOptions::default(),
    ) {
        Ok(report) => report,
        // A fresh token is never cancelled.
        Err(EvaluationError::Cancelled) => DomainReport::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn facade_builds_parses_and_evaluates() {
        let defs: Vec<ResourceDefinition> = serde_json::from_value(json!([
            {"id": "aws_instance.web", "type": "aws_instance",
             "attributes": {"subnet_id": "${aws_subnet.private.id}"},
             "references": ["aws_subnet.private.id"]},
            {"id": "aws_subnet.private", "type": "aws_subnet",
             "attributes": {"map_public_ip_on_launch": false}}
        ]))
        .expect("definitions");
        let built = build_graph(defs, &BuildOptions::default()).expect("graph");
        assert!(built.unresolved.is_empty());

        let policy = parse_policy_str(
            r#"
metadata: {id: CKV2_FACADE_1, category: networking}
definition:
  and:
    - resource_types: [aws_instance]
      attribute: subnet_id
      operator: exists
    - connection: {direction: outgoing, resource_type: aws_subnet}
      filter: {attribute: map_public_ip_on_launch, operator: is_false}
"#,
        )
        .expect("policy");

        let report = evaluate(&built.graph, &[&policy]);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].result, CheckResult::Passed);
        assert_eq!(report.counts.passed, 1);
    }
}

use crate::eval::{EvalOptions, Evaluator};
use crate::fingerprint::fingerprint_for_record;
use crate::graph::{NodeHandle, ResourceGraph};
use crate::hooks::{CancellationToken, SuppressionHook};
use crate::policy::Policy;
use crate::report::{DomainReport, ResultCounts};
use infraguard_types::{CheckRecord, CheckResult};
use log::debug;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("evaluation cancelled")]
    Cancelled,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOptions {
    /// Spread policies across the rayon pool. Output order is unaffected.
    pub parallel: bool,
    pub eval: EvalOptions,
}

/// Evaluate every policy against every in-scope node of `graph`.
///
/// Records come back ordered by the position of their policy in `policies`, then by
/// resource id, whether or not evaluation ran in parallel.
pub fn evaluate_policies(
    graph: &ResourceGraph,
    policies: &[&Policy],
    hook: &dyn SuppressionHook,
    cancel: &CancellationToken,
    options: &EngineOptions,
) -> Result<DomainReport, EvaluationError> {
    let handles = graph.handles_by_id();
    let evaluator = Evaluator::new(graph, options.eval);
    let run = |policy: &&Policy| {
        evaluate_policy(&evaluator, graph, policy, &handles, hook, cancel)
    };

    let per_policy: Vec<Vec<CheckRecord>> = if options.parallel {
        policies.par_iter().map(run).collect::<Result<_, _>>()?
    } else {
        policies.iter().map(run).collect::<Result<_, _>>()?
    };

    let records: Vec<CheckRecord> = per_policy.into_iter().flatten().collect();
    let counts = ResultCounts::from_records(&records);
    Ok(DomainReport { records, counts })
}

fn evaluate_policy(
    evaluator: &Evaluator<'_>,
    graph: &ResourceGraph,
    policy: &Policy,
    handles: &[NodeHandle],
    hook: &dyn SuppressionHook,
    cancel: &CancellationToken,
) -> Result<Vec<CheckRecord>, EvaluationError> {
    let started = Instant::now();
    let mut out = Vec::new();

    for &handle in handles {
        if cancel.is_cancelled() {
            return Err(EvaluationError::Cancelled);
        }
        let resource = graph.node(handle);
        if !policy.applies_to(&resource.resource_type) {
            continue;
        }

        let (result, evaluated_keys) = if hook.should_skip(&resource.id, policy.id()) {
            (CheckResult::Skipped, BTreeSet::new())
        } else {
            let evaluation = evaluator.evaluate(policy, handle);
            let result = if evaluation.result {
                CheckResult::Passed
            } else {
                CheckResult::Failed
            };
            (result, evaluation.evaluated_keys)
        };

        let meta = policy.metadata();
        out.push(CheckRecord {
            policy_id: meta.id.clone(),
            policy_name: policy.name().to_string(),
            category: meta.category.clone(),
            severity: meta.severity,
            resource_id: resource.id.clone(),
            resource_type: resource.resource_type.clone(),
            result,
            evaluated_keys,
            location: resource.source_location.clone(),
            fingerprint: Some(fingerprint_for_record(&meta.id, &resource.id)),
        });
    }

    debug!(
        "policy {}: {} records in {:?}",
        policy.id(),
        out.len(),
        started.elapsed()
    );
    Ok(out)
}

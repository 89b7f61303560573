//! Graph-check fixtures: one directory per policy id under `tests/fixtures/checks/`.
//!
//! Each directory holds `resources.yaml` (normalized resource definitions) and
//! `expected.yaml` listing the resource ids that pass, fail and are skipped, plus the
//! union of evaluated keys over passing and failing results. Resources listed under
//! `skip` are suppressed for the run.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use infraguard_domain::builder::{BuildOptions, build_graph};
use infraguard_domain::EngineOptions;
use infraguard_repo::{CheckRegistry, RunFilter, read_resource_definitions};
use infraguard_types::CheckResult;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Root of the shared fixtures tree (`<workspace>/tests/fixtures`).
pub fn fixtures_dir() -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("fixtures")
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExpectedResults {
    pub pass: BTreeSet<String>,
    pub fail: BTreeSet<String>,
    pub skip: BTreeSet<String>,
    pub evaluated_keys: BTreeSet<String>,
}

/// What a run actually produced, in the same shape as [`ExpectedResults`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphCheckOutcome {
    pub passed: BTreeSet<String>,
    pub failed: BTreeSet<String>,
    pub skipped: BTreeSet<String>,
    pub evaluated_keys: BTreeSet<String>,
}

/// Names of every fixture under `checks/`, sorted.
pub fn check_fixture_names() -> anyhow::Result<Vec<String>> {
    let dir = fixtures_dir().join("checks");
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("read {dir}"))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Load every policy under `policies/`, then run the one named `policy_id` against the
/// resources of `checks/<policy_id>`.
pub fn run_graph_check(policy_id: &str) -> anyhow::Result<(ExpectedResults, GraphCheckOutcome)> {
    let root = fixtures_dir();
    let check_dir = root.join("checks").join(policy_id);

    let expected_path = check_dir.join("expected.yaml");
    let expected_text =
        std::fs::read_to_string(&expected_path).with_context(|| format!("read {expected_path}"))?;
    let expected: ExpectedResults =
        serde_yaml::from_str(&expected_text).with_context(|| format!("parse {expected_path}"))?;

    let mut registry = CheckRegistry::new(vec![root.join("policies")]);
    let load = registry.load_roots()?;
    if let Some(err) = load.errors.first() {
        anyhow::bail!("fixture policy {} failed to load: {}", err.path, err.message);
    }

    let defs = read_resource_definitions(&check_dir.join("resources.yaml"))?;
    let built = build_graph(defs, &BuildOptions::default())?;

    let suppressed = expected.skip.clone();
    let hook = move |resource_id: &str, _policy_id: &str| suppressed.contains(resource_id);
    let report = registry.run(
        &built.graph,
        &RunFilter::only([policy_id]),
        &hook,
        &EngineOptions::default(),
    )?;

    let mut outcome = GraphCheckOutcome::default();
    for record in report.records {
        let bucket = match record.result {
            CheckResult::Passed => &mut outcome.passed,
            CheckResult::Failed => &mut outcome.failed,
            CheckResult::Skipped => &mut outcome.skipped,
        };
        bucket.insert(record.resource_id);
        if record.result != CheckResult::Skipped {
            outcome.evaluated_keys.extend(record.evaluated_keys);
        }
    }
    Ok((expected, outcome))
}

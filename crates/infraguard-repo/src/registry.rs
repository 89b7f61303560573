//! Check registry: loads policy documents from configured roots and runs them.

use crate::discover::{DiscoverOptions, discover_policies};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use infraguard_domain::graph::ResourceGraph;
use infraguard_domain::hooks::{CancellationToken, SuppressionHook};
use infraguard_domain::policy::{Policy, parse_policy_str};
use infraguard_domain::report::DomainReport;
use infraguard_domain::{EngineOptions, EvaluationError, evaluate_policies};
use infraguard_types::RepoPath;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("policy not found: {id}")]
    NotFound { id: String },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadErrorKind {
    Read,
    Parse,
    DuplicateId,
}

/// One policy document that did not make it into the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadError {
    pub path: RepoPath,
    pub policy_id: Option<String>,
    pub kind: LoadErrorKind,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Ids of the policies added, in load order.
    pub loaded: Vec<String>,
    pub errors: Vec<LoadError>,
}

impl LoadReport {
    fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.errors.extend(other.errors);
    }
}

/// Selects which loaded policies a run evaluates.
#[derive(Clone, Debug, Default)]
pub struct RunFilter {
    /// Only these ids; empty means every loaded policy.
    pub checks: Vec<String>,
    /// Never these ids, even when listed in `checks`.
    pub skip_checks: Vec<String>,
}

impl RunFilter {
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            checks: ids.into_iter().map(Into::into).collect(),
            skip_checks: Vec::new(),
        }
    }
}

struct Entry {
    policy: Policy,
    source: RepoPath,
}

pub struct CheckRegistry {
    roots: Vec<Utf8PathBuf>,
    discover: DiscoverOptions,
    cancel: CancellationToken,
    entries: Vec<Entry>,
    by_id: HashMap<String, usize>,
    by_category: BTreeMap<String, Vec<usize>>,
}

impl CheckRegistry {
    /// A registry that loads from `roots`, in order, when [`CheckRegistry::load_roots`] runs.
    pub fn new(roots: Vec<Utf8PathBuf>) -> Self {
        Self {
            roots,
            discover: DiscoverOptions::default(),
            cancel: CancellationToken::new(),
            entries: Vec::new(),
            by_id: HashMap::new(),
            by_category: BTreeMap::new(),
        }
    }

    pub fn with_discover_options(mut self, discover: DiscoverOptions) -> Self {
        self.discover = discover;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn roots(&self) -> &[Utf8PathBuf] {
        &self.roots
    }

    /// Load every configured root.
    pub fn load_roots(&mut self) -> anyhow::Result<LoadReport> {
        let mut report = LoadReport::default();
        for root in self.roots.clone() {
            report.merge(self.load(&root)?);
        }
        Ok(report)
    }

    /// Walk `dir`, parse every policy document and index the valid ones.
    ///
    /// Per-document failures land in the report; only directory-level failures
    /// (missing root, bad globs, cancellation) are returned as errors.
    pub fn load(&mut self, dir: &Utf8Path) -> anyhow::Result<LoadReport> {
        let files = discover_policies(dir, &self.discover, &self.cancel)
            .with_context(|| format!("discover policies under {dir}"))?;

        let mut report = LoadReport::default();
        for rel in files {
            if self.cancel.is_cancelled() {
                return Err(EvaluationError::Cancelled.into());
            }
            let abs = dir.join(rel.as_str());
            let source = RepoPath::from(abs.as_path());

            let text = match std::fs::read_to_string(&abs) {
                Ok(text) => text,
                Err(e) => {
                    warn!("cannot read policy {abs}: {e}");
                    report.errors.push(LoadError {
                        path: source,
                        policy_id: None,
                        kind: LoadErrorKind::Read,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match parse_policy_str(&text) {
                Ok(policy) => match self.insert(policy, source.clone()) {
                    Ok(id) => report.loaded.push(id),
                    Err(err) => {
                        warn!("{}: {}", err.path, err.message);
                        report.errors.push(err);
                    }
                },
                Err(e) => {
                    warn!("skipping policy {abs}: {e}");
                    report.errors.push(LoadError {
                        path: source,
                        policy_id: e.policy_id.clone(),
                        kind: LoadErrorKind::Parse,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "loaded {} policies from {dir} ({} errors)",
            report.loaded.len(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Add an already-parsed policy. The first policy registered under an id wins.
    pub fn insert(&mut self, policy: Policy, source: RepoPath) -> Result<String, LoadError> {
        let id = policy.id().to_string();
        if let Some(&existing) = self.by_id.get(&id) {
            return Err(LoadError {
                message: format!(
                    "duplicate policy id {id} (first defined in {})",
                    self.entries[existing].source
                ),
                path: source,
                policy_id: Some(id),
                kind: LoadErrorKind::DuplicateId,
            });
        }

        let idx = self.entries.len();
        self.by_id.insert(id.clone(), idx);
        self.by_category
            .entry(policy.category().to_string())
            .or_default()
            .push(idx);
        self.entries.push(Entry { policy, source });
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<&Policy, RegistryError> {
        self.by_id
            .get(id)
            .map(|&idx| &self.entries[idx].policy)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Where a loaded policy came from.
    pub fn source_of(&self, id: &str) -> Option<&RepoPath> {
        self.by_id.get(id).map(|&idx| &self.entries[idx].source)
    }

    pub fn by_category(&self, category: &str) -> Vec<&Policy> {
        self.by_category
            .get(category)
            .map(|idxs| idxs.iter().map(|&i| &self.entries[i].policy).collect())
            .unwrap_or_default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.by_category.keys().map(String::as_str)
    }

    /// Policy ids in load order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.policy.id())
    }

    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.entries.iter().map(|e| &e.policy)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Policies a run would evaluate, in load order.
    ///
    /// Every id named in `filter.checks` must be loaded.
    pub fn select(&self, filter: &RunFilter) -> Result<Vec<&Policy>, RegistryError> {
        for id in &filter.checks {
            self.get(id)?;
        }
        Ok(self
            .entries
            .iter()
            .map(|e| &e.policy)
            .filter(|p| filter.checks.is_empty() || filter.checks.iter().any(|c| c == p.id()))
            .filter(|p| !filter.skip_checks.iter().any(|c| c == p.id()))
            .collect())
    }

    /// Evaluate the selected policies against `graph`.
    pub fn run(
        &self,
        graph: &ResourceGraph,
        filter: &RunFilter,
        hook: &dyn SuppressionHook,
        options: &EngineOptions,
    ) -> Result<DomainReport, RegistryError> {
        let selected = self.select(filter)?;
        Ok(evaluate_policies(graph, &selected, hook, &self.cancel, options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infraguard_domain::policy::parse_policy_str;

    fn policy(id: &str, category: &str) -> Policy {
        parse_policy_str(&format!(
            "metadata: {{id: {id}, category: {category}}}\ndefinition: {{attribute: a, operator: exists}}\n"
        ))
        .expect("parse")
    }

    fn registry() -> CheckRegistry {
        let mut reg = CheckRegistry::new(Vec::new());
        for (id, cat) in [("P3", "network"), ("P1", "encryption"), ("P2", "encryption")] {
            reg.insert(policy(id, cat), RepoPath::new(format!("{id}.yaml")))
                .expect("insert");
        }
        reg
    }

    #[test]
    fn get_and_not_found() {
        let reg = registry();
        assert_eq!(reg.get("P1").expect("found").id(), "P1");
        assert!(matches!(reg.get("P9"), Err(RegistryError::NotFound { id }) if id == "P9"));
    }

    #[test]
    fn duplicate_ids_keep_the_first_policy() {
        let mut reg = registry();
        let err = reg
            .insert(policy("P1", "network"), RepoPath::new("other/P1.yaml"))
            .expect_err("duplicate");
        assert_eq!(err.kind, LoadErrorKind::DuplicateId);
        assert!(err.message.contains("P1.yaml"));
        assert_eq!(reg.get("P1").expect("found").category(), "encryption");
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn categories_index_in_load_order() {
        let reg = registry();
        let ids: Vec<&str> = reg.by_category("encryption").iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["P1", "P2"]);
        assert!(reg.by_category("iam").is_empty());
        assert_eq!(reg.categories().collect::<Vec<_>>(), vec!["encryption", "network"]);
    }

    #[test]
    fn select_applies_allow_and_deny_lists_in_load_order() {
        let reg = registry();
        let all: Vec<&str> = reg
            .select(&RunFilter::default())
            .expect("select")
            .iter()
            .map(|p| p.id())
            .collect();
        assert_eq!(all, vec!["P3", "P1", "P2"]);

        let filter = RunFilter {
            checks: vec!["P2".to_string(), "P3".to_string()],
            skip_checks: vec!["P3".to_string()],
        };
        let some: Vec<&str> = reg.select(&filter).expect("select").iter().map(|p| p.id()).collect();
        assert_eq!(some, vec!["P2"]);

        assert!(matches!(
            reg.select(&RunFilter::only(["P404"])),
            Err(RegistryError::NotFound { .. })
        ));
    }
}

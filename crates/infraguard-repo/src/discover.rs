use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use infraguard_domain::hooks::CancellationToken;
use infraguard_domain::EvaluationError;
use infraguard_types::RepoPath;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Which files under a checks directory are policy documents.
#[derive(Clone, Debug)]
pub struct DiscoverOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            include: ["**/*.yaml", "**/*.yml", "**/*.json"]
                .into_iter()
                .map(String::from)
                .collect(),
            exclude: Vec::new(),
        }
    }
}

/// Discover policy documents under `root`, as paths relative to `root`.
///
/// Output is sorted so load order does not depend on filesystem traversal order.
/// Cancellation is checked between directory entries.
pub fn discover_policies(
    root: &Utf8Path,
    options: &DiscoverOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<Vec<RepoPath>> {
    if !root.is_dir() {
        anyhow::bail!("checks directory does not exist: {root}");
    }

    let include = build_globset(&options.include).context("compile policy globset")?;
    let exclude = build_globset(&options.exclude).context("compile exclude globset")?;

    let mut out: Vec<RepoPath> = Vec::new();
    for entry in WalkDir::new(root) {
        if cancel.is_cancelled() {
            return Err(EvaluationError::Cancelled.into());
        }
        let entry = entry.with_context(|| format!("walk {root}"))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(abs) = pathbuf_to_utf8(entry.path().to_path_buf()) else {
            continue;
        };
        let rel = abs
            .strip_prefix(root)
            .unwrap_or(&abs)
            .as_str()
            .replace('\\', "/");

        if include.is_match(&rel) && !exclude.is_match(&rel) {
            out.push(RepoPath::new(&rel));
        }
    }

    // Stable order.
    out.sort();
    out.dedup();

    Ok(out)
}

pub(crate) fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        b.add(Glob::new(p).with_context(|| format!("invalid glob: {p}"))?);
    }
    Ok(b.build()?)
}

fn pathbuf_to_utf8(path: PathBuf) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).ok()
}

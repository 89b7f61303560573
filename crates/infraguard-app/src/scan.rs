//! The `scan` use case: load policies, build the resource graph, evaluate, produce a report.

use crate::diagnostics;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use infraguard_domain::builder::{ResourceDefinition, build_graph};
use infraguard_domain::hooks::{CancellationToken, NoSuppression, SuppressionHook};
use infraguard_repo::{CheckRegistry, DiscoverOptions, RunFilter};
use infraguard_settings::{InfraguardConfigV1, Overrides, ResolvedConfig};
use infraguard_types::{Diagnostic, SCHEMA_REPORT_V1, ScanReport, Summary, ToolMeta, ids};
use log::info;
use time::OffsetDateTime;

/// Input for the scan use case.
pub struct ScanInput<'a> {
    /// Directory relative `checks_dirs` are resolved against.
    pub base_dir: &'a Utf8Path,
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    pub overrides: Overrides,
    /// Normalized resources from the source-dialect parsers.
    pub resources: Vec<ResourceDefinition>,
    /// External suppression (baselines, inline annotations); `None` suppresses nothing.
    pub suppression: Option<&'a dyn SuppressionHook>,
    pub cancel: CancellationToken,
}

/// Output from the scan use case.
#[derive(Clone, Debug)]
pub struct ScanOutput {
    pub report: ScanReport,
    /// The resolved configuration used.
    pub resolved_config: ResolvedConfig,
}

pub fn run_scan(input: ScanInput<'_>) -> anyhow::Result<ScanOutput> {
    let started_at = OffsetDateTime::now_utc();

    // Parse config (empty is allowed, defaults apply).
    let cfg = if input.config_text.trim().is_empty() {
        InfraguardConfigV1::default()
    } else {
        infraguard_settings::parse_config_toml(input.config_text).context("parse config")?
    };
    let resolved =
        infraguard_settings::resolve_config(cfg, input.overrides).context("resolve config")?;

    let roots: Vec<Utf8PathBuf> = resolved
        .checks_dirs
        .iter()
        .map(|dir| absolutize(input.base_dir, dir))
        .collect();
    let mut registry = CheckRegistry::new(roots)
        .with_discover_options(DiscoverOptions {
            include: resolved.policy_globs.clone(),
            exclude: resolved.exclude.clone(),
        })
        .with_cancellation(input.cancel.clone());
    let load = registry.load_roots().context("load policies")?;

    let mut diagnostics: Vec<Diagnostic> = load
        .errors
        .iter()
        .map(|err| diagnostics::from_load_error(err, input.base_dir))
        .collect();

    let built = build_graph(input.resources, &resolved.build).context("build resource graph")?;
    diagnostics.extend(built.unresolved.iter().map(diagnostics::from_unresolved));

    let filter = RunFilter {
        checks: resolved.checks.clone(),
        skip_checks: resolved.skip_checks.clone(),
    };
    let hook: &dyn SuppressionHook = input.suppression.unwrap_or(&NoSuppression);
    let domain = registry
        .run(&built.graph, &filter, hook, &resolved.engine)
        .context("evaluate policies")?;

    let summary = Summary::from_parts(&domain.records, &diagnostics);
    info!(
        "scan complete: {} passed, {} failed, {} skipped, {} diagnostics",
        summary.passed,
        summary.failed,
        summary.skipped,
        diagnostics.len()
    );

    let report = ScanReport {
        schema: SCHEMA_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: ids::TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        started_at,
        finished_at: OffsetDateTime::now_utc(),
        records: domain.records,
        diagnostics,
        summary,
    };

    Ok(ScanOutput {
        report,
        resolved_config: resolved,
    })
}

fn absolutize(base: &Utf8Path, dir: &str) -> Utf8PathBuf {
    let path = Utf8Path::new(dir);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

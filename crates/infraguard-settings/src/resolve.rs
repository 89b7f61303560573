use crate::defaults::{self, SCHEMA_CONFIG_V1};
use crate::model::InfraguardConfigV1;
use anyhow::Context;
use globset::Glob;
use infraguard_domain::builder::BuildOptions;
use infraguard_domain::{EngineOptions, EvalOptions};
use std::collections::BTreeSet;

/// Values supplied explicitly by the caller; they win over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub checks_dirs: Option<Vec<String>>,
    pub checks: Option<Vec<String>>,
    pub parallel: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub checks_dirs: Vec<String>,
    pub checks: Vec<String>,
    pub skip_checks: Vec<String>,
    pub policy_globs: Vec<String>,
    pub exclude: Vec<String>,
    pub engine: EngineOptions,
    pub build: BuildOptions,
}

pub fn resolve_config(
    cfg: InfraguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    if let Some(schema) = cfg.schema.as_deref()
        && schema != SCHEMA_CONFIG_V1
    {
        anyhow::bail!("unsupported config schema: {schema} (expected {SCHEMA_CONFIG_V1})");
    }

    let checks_dirs = overrides
        .checks_dirs
        .or(cfg.checks_dirs)
        .unwrap_or_else(|| defaults::owned(defaults::CHECKS_DIRS));
    if checks_dirs.is_empty() {
        anyhow::bail!("checks_dirs must name at least one directory");
    }

    let checks = overrides.checks.unwrap_or(cfg.checks);

    let policy_globs = cfg
        .policy_globs
        .unwrap_or_else(|| defaults::owned(defaults::POLICY_GLOBS));
    validate_globs("policy_globs", &policy_globs)?;
    validate_globs("exclude", &cfg.exclude)?;

    let engine = EngineOptions {
        parallel: overrides
            .parallel
            .or(cfg.parallel)
            .unwrap_or(defaults::PARALLEL),
        eval: EvalOptions {
            collect_skipped_keys: cfg.collect_skipped_keys.unwrap_or(false),
        },
    };

    let build = match cfg.passthrough_types {
        Some(types) => BuildOptions {
            passthrough_types: types.into_iter().collect::<BTreeSet<_>>(),
        },
        None => BuildOptions::default(),
    };

    Ok(ResolvedConfig {
        checks_dirs,
        checks,
        skip_checks: cfg.skip_checks,
        policy_globs,
        exclude: cfg.exclude,
        engine,
        build,
    })
}

fn validate_globs(field: &str, patterns: &[String]) -> anyhow::Result<()> {
    for pattern in patterns {
        Glob::new(pattern).with_context(|| format!("invalid {field} glob: {pattern}"))?;
    }
    Ok(())
}

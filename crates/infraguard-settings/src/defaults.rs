//! Built-in defaults, the lowest layer of resolution.

pub const SCHEMA_CONFIG_V1: &str = "infraguard.config.v1";

pub(crate) const CHECKS_DIRS: &[&str] = &["policies"];

pub(crate) const POLICY_GLOBS: &[&str] = &["**/*.yaml", "**/*.yml", "**/*.json"];

pub(crate) const PARALLEL: bool = true;

pub(crate) fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

//! Config parsing and resolution.
//!
//! This crate is intentionally IO-free: it parses and resolves configuration provided as strings.

#![forbid(unsafe_code)]

mod defaults;
mod model;
mod resolve;

pub use defaults::SCHEMA_CONFIG_V1;
pub use model::InfraguardConfigV1;
pub use resolve::{Overrides, ResolvedConfig};

/// Parse `infraguard.toml` (or equivalent) into a typed model. Empty input means all defaults.
pub fn parse_config_toml(input: &str) -> anyhow::Result<InfraguardConfigV1> {
    let cfg: InfraguardConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective config: built-in defaults, then the file, then explicit overrides.
pub fn resolve_config(
    cfg: InfraguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}

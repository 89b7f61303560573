//! Repository adapters: discover and load policy documents, read resource definitions.
//!
//! This crate is allowed to do filesystem IO. It does not parse source dialects; those
//! arrive as normalized resource definitions produced elsewhere.

#![forbid(unsafe_code)]

mod discover;
mod registry;
mod resources;

pub use discover::{DiscoverOptions, discover_policies};
pub use registry::{
    CheckRegistry, LoadError, LoadErrorKind, LoadReport, RegistryError, RunFilter,
};
pub use resources::read_resource_definitions;

/// Fuzz-friendly API for testing parsing robustness without filesystem access.
/// These functions are designed to never panic on any input.
pub mod fuzz {
    use infraguard_domain::attr_path::AttributePath;
    use infraguard_domain::policy::parse_policy_str;

    /// Parse arbitrary text as a policy document and render it back.
    ///
    /// Returns `Ok(())` when the text is a valid policy. **Never panics** on any input.
    pub fn parse_policy_text(text: &str) -> anyhow::Result<()> {
        let policy = parse_policy_str(text)?;
        let _ = policy.to_document();
        Ok(())
    }

    /// Compile an attribute path. **Never panics** on any input.
    pub fn compile_attribute_path(text: &str) -> anyhow::Result<String> {
        Ok(AttributePath::parse(text)?.to_string())
    }

    /// Match policy-discovery globs against a list of candidate paths.
    ///
    /// This tests the glob compilation and matching logic without filesystem access.
    /// Returns `Ok(matched_paths)` if the patterns are valid, `Err(...)` otherwise.
    /// **Never panics** on any input.
    pub fn expand_globs(patterns: &[String], candidates: &[String]) -> anyhow::Result<Vec<String>> {
        let set = crate::discover::build_globset(patterns)?;
        Ok(candidates
            .iter()
            .filter(|c| set.is_match(c.as_str()))
            .cloned()
            .collect())
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `infraguard.toml` schema v1.
///
/// This is a *user-facing* config model: it is intentionally permissive so forward-compat is easy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InfraguardConfigV1 {
    /// Optional schema string for tooling (`infraguard.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Roots the check registry loads policies from, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks_dirs: Option<Vec<String>>,

    /// Allow-list of policy ids to run. Empty runs everything loaded.
    #[serde(default)]
    pub checks: Vec<String>,

    /// Deny-list of policy ids. Wins over `checks`.
    #[serde(default)]
    pub skip_checks: Vec<String>,

    /// Globs (relative to a checks dir) selecting policy documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_globs: Option<Vec<String>>,

    /// Globs excluded from policy discovery.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Evaluate policies on the rayon pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,

    /// Default for combinators that do not set `collect_skipped_keys` themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_skipped_keys: Option<bool>,

    /// Resource kinds the graph builder looks through when attributing references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough_types: Option<Vec<String>>,
}

//! Stable identifiers for diagnostic codes and reserved names.
//!
//! Codes are short snake_case discriminators carried on `Diagnostic::code`.

// Codes: policy loading
pub const CODE_POLICY_PARSE: &str = "policy_parse";
pub const CODE_POLICY_READ: &str = "policy_read";
pub const CODE_DUPLICATE_POLICY: &str = "duplicate_policy";

// Codes: graph building
pub const CODE_UNRESOLVED_REFERENCE: &str = "unresolved_reference";
pub const CODE_SELF_REFERENCE: &str = "self_reference";

/// Pseudo-attribute resolving to a node's declared kind.
pub const ATTR_RESOURCE_TYPE: &str = "resource_type";

/// Resource-type wildcard accepted in policy scopes.
pub const RESOURCE_TYPE_ALL: &str = "all";

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "infraguard.toml";

/// Tool name used in report envelopes.
pub const TOOL_NAME: &str = "infraguard";

//! Recoverable problems from loading and graph building, as report diagnostics.

use camino::Utf8Path;
use infraguard_domain::builder::{UnresolvedReason, UnresolvedReference};
use infraguard_repo::{LoadError, LoadErrorKind};
use infraguard_types::{Diagnostic, DiagnosticKind, RepoPath, ids};

/// Load errors carry the path the registry read; report it relative to `base` when it lies below.
pub(crate) fn from_load_error(err: &LoadError, base: &Utf8Path) -> Diagnostic {
    let (kind, code) = match err.kind {
        LoadErrorKind::Read => (DiagnosticKind::PolicyParse, ids::CODE_POLICY_READ),
        LoadErrorKind::Parse => (DiagnosticKind::PolicyParse, ids::CODE_POLICY_PARSE),
        LoadErrorKind::DuplicateId => (DiagnosticKind::DuplicatePolicy, ids::CODE_DUPLICATE_POLICY),
    };
    Diagnostic {
        kind,
        code: code.to_string(),
        message: err.message.clone(),
        path: Some(relative_to(&err.path, base)),
        policy_id: err.policy_id.clone(),
        resource_id: None,
    }
}

fn relative_to(path: &RepoPath, base: &Utf8Path) -> RepoPath {
    match Utf8Path::new(path.as_str()).strip_prefix(base) {
        Ok(rel) => RepoPath::from(rel),
        Err(_) => path.clone(),
    }
}

pub(crate) fn from_unresolved(u: &UnresolvedReference) -> Diagnostic {
    let (code, what) = match u.reason {
        UnresolvedReason::NoMatchingResource => {
            (ids::CODE_UNRESOLVED_REFERENCE, "matches no resource")
        }
        UnresolvedReason::SelfReference => (ids::CODE_SELF_REFERENCE, "refers to its own resource"),
    };
    let attribute = if u.attribute.is_empty() {
        String::new()
    } else {
        format!(" (attribute {})", u.attribute)
    };
    Diagnostic {
        kind: DiagnosticKind::UnresolvedReference,
        code: code.to_string(),
        message: format!("reference {}{attribute} {what}", u.expression),
        path: None,
        policy_id: None,
        resource_id: Some(u.from_id.clone()),
    }
}

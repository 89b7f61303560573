//! Stable DTOs and IDs used across the infraguard workspace.
//!
//! This crate is intentionally boring:
//! - data types for the emitted check records and scan report
//! - stable string IDs and diagnostic codes
//! - canonical repo-relative path handling

#![forbid(unsafe_code)]

pub mod ids;
pub mod path;
pub mod record;

pub use path::RepoPath;
pub use record::{
    CheckRecord, CheckResult, Diagnostic, DiagnosticKind, SCHEMA_REPORT_V1, ScanReport, Severity,
    SourceLocation, Summary, ToolMeta,
};

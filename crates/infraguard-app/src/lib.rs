//! Use case orchestration for infraguard.
//!
//! This crate provides the application layer: use cases that coordinate the settings, repo
//! and domain layers. It is intentionally thin and delegates heavy lifting to those layers.

#![forbid(unsafe_code)]

mod diagnostics;
mod report;
mod scan;

pub use report::{parse_report_json, serialize_report, write_report};
pub use scan::{ScanInput, ScanOutput, run_scan};

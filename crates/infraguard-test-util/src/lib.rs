//! Shared test utilities for the infraguard workspace.
//!
//! `xtask` compares scan reports against golden files at runtime, so report
//! normalization cannot live behind `#[cfg(test)]` in `infraguard-types`.

mod fixture;

pub use fixture::{
    ExpectedResults, GraphCheckOutcome, check_fixture_names, fixtures_dir, run_graph_check,
};

use serde_json::Value;

const PLACEHOLDER_VERSION: &str = "__VERSION__";
const PLACEHOLDER_TIMESTAMP: &str = "__TIMESTAMP__";
const TIMESTAMP_KEYS: &[&str] = &["started_at", "finished_at"];

/// Normalize non-deterministic report fields for golden-file comparison.
///
/// `tool.version` is replaced only on a root object shaped like a scan report
/// (`schema`, `tool`, `records`, `summary`); nested look-alikes keep theirs.
/// Timestamp keys are replaced at any depth.
pub fn normalize_nondeterministic(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        let is_report = ["schema", "tool", "records", "summary"]
            .iter()
            .all(|k| obj.contains_key(*k));
        if is_report
            && let Some(tool) = obj.get_mut("tool").and_then(Value::as_object_mut)
            && tool.contains_key("version")
        {
            tool.insert(
                "version".to_string(),
                Value::String(PLACEHOLDER_VERSION.to_string()),
            );
        }
    }
    normalize_timestamps(&mut value);
    value
}

fn normalize_timestamps(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in TIMESTAMP_KEYS {
                if let Some(slot) = map.get_mut(*key) {
                    *slot = Value::String(PLACEHOLDER_TIMESTAMP.to_string());
                }
            }
            map.values_mut().for_each(normalize_timestamps);
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_timestamps),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_envelope_version_and_timestamps_are_replaced() {
        let input = json!({
            "schema": "infraguard.report.v1",
            "tool": { "name": "infraguard", "version": "0.1.0" },
            "started_at": "2026-01-01T00:00:00Z",
            "finished_at": "2026-01-01T00:00:01Z",
            "records": [],
            "summary": { "passed": 0 }
        });

        let result = normalize_nondeterministic(input);

        assert_eq!(result["tool"]["version"], PLACEHOLDER_VERSION);
        assert_eq!(result["tool"]["name"], "infraguard");
        assert_eq!(result["started_at"], PLACEHOLDER_TIMESTAMP);
        assert_eq!(result["finished_at"], PLACEHOLDER_TIMESTAMP);
    }

    #[test]
    fn nested_report_like_objects_keep_their_version() {
        let input = json!({
            "schema": "infraguard.report.v1",
            "tool": { "name": "infraguard", "version": "0.1.0" },
            "records": [
                {
                    "schema": "fake",
                    "tool": { "name": "inner", "version": "9.9.9" },
                    "records": [],
                    "summary": {},
                    "started_at": "2026-06-01T12:00:00Z"
                }
            ],
            "summary": {}
        });

        let result = normalize_nondeterministic(input);

        assert_eq!(result["tool"]["version"], PLACEHOLDER_VERSION);
        assert_eq!(result["records"][0]["tool"]["version"], "9.9.9");
        assert_eq!(result["records"][0]["started_at"], PLACEHOLDER_TIMESTAMP);
    }

    #[test]
    fn non_report_roots_only_lose_timestamps() {
        let input = json!({
            "tool": { "name": "other", "version": "2.0.0" },
            "started_at": "2026-01-01T00:00:00Z"
        });

        let result = normalize_nondeterministic(input);

        assert_eq!(result["tool"]["version"], "2.0.0");
        assert_eq!(result["started_at"], PLACEHOLDER_TIMESTAMP);
    }
}

//! Developer tasks (schema generation, policy linting, scan conformance).
//!
//! Keeping this separate avoids bloating the library crates.

use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use infraguard_app::{ScanInput, run_scan, serialize_report};
use infraguard_domain::hooks::CancellationToken;
use infraguard_repo::{CheckRegistry, read_resource_definitions};
use infraguard_settings::Overrides;
use infraguard_test_util::normalize_nondeterministic;
use infraguard_types::ids;
use log::{debug, info};
use schemars::schema_for;
use std::fs;

/// Workspace root (parent of the xtask directory).
fn project_root() -> Utf8PathBuf {
    let manifest_dir = Utf8Path::new(env!("CARGO_MANIFEST_DIR"));
    match manifest_dir.parent() {
        Some(parent) if manifest_dir.ends_with("xtask") => parent.to_path_buf(),
        _ => manifest_dir.to_path_buf(),
    }
}

fn schemas_dir() -> Utf8PathBuf {
    project_root().join("schemas")
}

fn scan_fixtures_dir() -> Utf8PathBuf {
    project_root().join("tests").join("fixtures").join("scan")
}

/// Schema definition with its target filename.
struct SchemaSpec {
    filename: &'static str,
    generate: fn() -> schemars::Schema,
}

fn generate_report_schema() -> schemars::Schema {
    schema_for!(infraguard_types::ScanReport)
}

fn generate_config_schema() -> schemars::Schema {
    schema_for!(infraguard_settings::InfraguardConfigV1)
}

fn schema_specs() -> Vec<SchemaSpec> {
    vec![
        SchemaSpec {
            filename: "infraguard.report.v1.json",
            generate: generate_report_schema,
        },
        SchemaSpec {
            filename: "infraguard.config.v1.json",
            generate: generate_config_schema,
        },
    ]
}

/// Pretty JSON with a trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("serialize schema")?;
    json.push('\n');
    Ok(json)
}

fn emit_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    fs::create_dir_all(&dir).with_context(|| format!("create {dir}"))?;

    for spec in schema_specs() {
        let json = serialize_schema(&(spec.generate)())?;
        let path = dir.join(spec.filename);
        fs::write(&path, &json).with_context(|| format!("write {path}"))?;
        println!("Wrote {path}");
    }
    Ok(())
}

/// Fails when `schemas/` is missing a file or differs from what the types generate.
fn validate_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for spec in schema_specs() {
        let path = dir.join(spec.filename);
        if !path.exists() {
            missing.push(spec.filename);
            continue;
        }
        let expected = serialize_schema(&(spec.generate)())?;
        let actual = fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
        if expected != actual {
            mismatched.push(spec.filename);
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        println!("All schemas are up to date.");
        return Ok(());
    }
    for name in &missing {
        eprintln!("missing schema: {name}");
    }
    for name in &mismatched {
        eprintln!("schema out of date: {name}");
    }
    eprintln!("\nRun `cargo xtask emit-schemas` to regenerate.");
    bail!("schema validation failed")
}

/// Load every policy under each directory and report documents that fail to load.
fn lint_policies(dirs: &[String]) -> anyhow::Result<()> {
    if dirs.is_empty() {
        bail!("lint-policies needs at least one directory");
    }
    let roots: Vec<Utf8PathBuf> = dirs.iter().map(Utf8PathBuf::from).collect();
    let mut registry = CheckRegistry::new(roots);
    let report = registry.load_roots()?;

    for err in &report.errors {
        eprintln!("{}: {}", err.path, err.message);
    }
    for category in registry.categories() {
        println!("{category}: {} policies", registry.by_category(category).len());
    }
    if !report.errors.is_empty() {
        bail!(
            "{} of {} policy documents failed to load",
            report.errors.len(),
            report.errors.len() + report.loaded.len()
        );
    }
    println!("{} policies loaded", report.loaded.len());
    Ok(())
}

/// Absolute paths, parent traversal and backslashes have no place in a report.
fn is_clean_path(path: &str) -> bool {
    !(path.starts_with('/')
        || path.contains("..")
        || path.contains('\\')
        || (path.len() >= 2 && path.as_bytes()[1] == b':'))
}

fn scan_fixture(dir: &Utf8Path) -> anyhow::Result<serde_json::Value> {
    let config_path = dir.join(ids::CONFIG_FILE_NAME);
    let config = if config_path.exists() {
        fs::read_to_string(&config_path).with_context(|| format!("read {config_path}"))?
    } else {
        String::new()
    };
    let resources = read_resource_definitions(&dir.join("resources.yaml"))?;
    let output = run_scan(ScanInput {
        base_dir: dir,
        config_text: &config,
        overrides: Overrides::default(),
        resources,
        suppression: None,
        cancel: CancellationToken::new(),
    })?;
    let bytes = serialize_report(&output.report)?;
    serde_json::from_slice(&bytes).context("reparse report")
}

fn report_paths(report: &serde_json::Value) -> Vec<String> {
    let located = |key: &str, field: &str| -> Vec<String> {
        report[key]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|item| item.pointer(field).and_then(|p| p.as_str()))
            .map(str::to_string)
            .collect()
    };
    let mut paths = located("records", "/location/path");
    paths.extend(located("diagnostics", "/path"));
    paths
}

/// Scan every fixture under `tests/fixtures/scan/`, validate the report against the
/// generated schema, check path hygiene, and compare with `expected.report.json` when present.
///
/// With `bless`, golden files are (re)written instead of compared.
fn conform(bless: bool) -> anyhow::Result<()> {
    let schema = serde_json::to_value(generate_report_schema()).context("report schema")?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("compile report schema: {e}"))?;

    let fixtures = scan_fixtures_dir();
    let mut entries: Vec<Utf8PathBuf> = Vec::new();
    for entry in fs::read_dir(&fixtures).with_context(|| format!("read {fixtures}"))? {
        let path = Utf8PathBuf::try_from(entry?.path()).context("non-UTF-8 fixture path")?;
        if path.is_dir() {
            entries.push(path);
        }
    }
    entries.sort();

    let mut errors = Vec::new();
    for dir in &entries {
        let name = dir.file_name().unwrap_or_default();
        debug!("scanning fixture {name}");
        let report = match scan_fixture(dir) {
            Ok(report) => report,
            Err(e) => {
                errors.push(format!("fixture '{name}': scan failed: {e:#}"));
                continue;
            }
        };

        for err in validator.iter_errors(&report) {
            errors.push(format!("fixture '{name}': schema validation: {err}"));
        }
        for path in report_paths(&report) {
            if !is_clean_path(&path) {
                errors.push(format!("fixture '{name}': unclean path in report: {path}"));
            }
        }

        let golden_path = dir.join("expected.report.json");
        let normalized = normalize_nondeterministic(report);
        if bless {
            let mut text = serde_json::to_string_pretty(&normalized)?;
            text.push('\n');
            fs::write(&golden_path, text).with_context(|| format!("write {golden_path}"))?;
            println!("  blessed {golden_path}");
        } else if golden_path.exists() {
            let text =
                fs::read_to_string(&golden_path).with_context(|| format!("read {golden_path}"))?;
            let golden: serde_json::Value =
                serde_json::from_str(&text).with_context(|| format!("parse {golden_path}"))?;
            if normalize_nondeterministic(golden) == normalized {
                println!("  ✓ fixture '{name}' matches expected.report.json");
            } else {
                errors.push(format!("fixture '{name}': output differs from expected.report.json"));
            }
        } else {
            println!("  ✓ fixture '{name}' produces a valid report (no golden file)");
        }
    }

    if !errors.is_empty() {
        for err in &errors {
            eprintln!("  - {err}");
        }
        bail!("conformance failed with {} errors", errors.len());
    }
    info!("{} scan fixtures checked", entries.len());
    Ok(())
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help                     Show this message");
    eprintln!("  emit-schemas             Generate JSON schemas from Rust types to schemas/");
    eprintln!("  validate-schemas         Check if schemas/ matches generated output (for CI)");
    eprintln!("  print-schema-ids         Print known schema IDs");
    eprintln!("  lint-policies <dir>...   Load policy directories and report broken documents");
    eprintln!("  conform                  Scan tests/fixtures/scan/* and check reports");
    eprintln!("  bless                    Rewrite expected.report.json for every scan fixture");
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "validate-schemas" => validate_schemas(),
        "lint-policies" => lint_policies(&args[2..]),
        "conform" => conform(false),
        "bless" => conform(true),
        "print-schema-ids" => {
            println!("{}", infraguard_types::SCHEMA_REPORT_V1);
            println!("{}", infraguard_settings::SCHEMA_CONFIG_V1);
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}

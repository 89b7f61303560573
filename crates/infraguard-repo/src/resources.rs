use anyhow::Context;
use camino::Utf8Path;
use infraguard_domain::builder::ResourceDefinition;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum ResourceFile {
    List(Vec<ResourceDefinition>),
    Wrapped { resources: Vec<ResourceDefinition> },
}

/// Read normalized resource definitions (the source parsers' output) from a
/// `.json`, `.yaml` or `.yml` file.
///
/// Accepts either a top-level list or a mapping with a `resources` list.
pub fn read_resource_definitions(path: &Utf8Path) -> anyhow::Result<Vec<ResourceDefinition>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let ext = path.extension().map(str::to_ascii_lowercase);
    let file: ResourceFile = match ext.as_deref() {
        Some("json") => serde_json::from_str(&text).with_context(|| format!("parse {path}"))?,
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&text).with_context(|| format!("parse {path}"))?
        }
        _ => anyhow::bail!(
            "unsupported resource file extension: {path} (expected .json, .yaml or .yml)"
        ),
    };
    Ok(match file {
        ResourceFile::List(defs) | ResourceFile::Wrapped { resources: defs } => defs,
    })
}

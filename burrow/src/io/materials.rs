//! Material classification load/save with schema + invariant validation.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::invariants::validate_materials;
use crate::core::materials::MaterialClassification;

pub const MATERIALS_SCHEMA: &str = include_str!("../../schemas/materials.schema.json");

/// Load and validate the classification document at `path`.
pub fn load_materials(path: &Path) -> Result<MaterialClassification> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read materials {}", path.display()))?;
    let table = parse_materials(&contents).with_context(|| format!("load {}", path.display()))?;
    debug!(
        path = %path.display(),
        groups = table.equivalents.len(),
        excluded = table.excluded.len(),
        rare = table.rare.len(),
        "material classification loaded"
    );
    Ok(table)
}

/// Parse a classification document: schema check, then semantic invariants.
pub fn parse_materials(contents: &str) -> Result<MaterialClassification> {
    let value: Value = serde_json::from_str(contents).context("parse materials json")?;
    validate_schema(&value)?;
    let table: MaterialClassification =
        serde_json::from_value(value).context("deserialize materials")?;
    let errors = validate_materials(&table);
    if !errors.is_empty() {
        return Err(anyhow!("materials invariants failed: {}", errors.join("; ")));
    }
    Ok(table)
}

/// Write the classification as pretty JSON with trailing newline.
pub fn write_materials(path: &Path, table: &MaterialClassification) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(table).context("serialize materials")?;
    buf.push('\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, buf).with_context(|| format!("write materials {}", path.display()))
}

fn validate_schema(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(MATERIALS_SCHEMA).context("parse materials schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(value) {
        let messages = compiled
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "materials schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

/// Starter table written by `burrow init`.
pub fn default_materials() -> MaterialClassification {
    let groups: [(&str, &[&str]); 8] = [
        ("minecraft:coal_ore", &["minecraft:coal"]),
        ("minecraft:iron_ore", &["minecraft:raw_iron"]),
        ("minecraft:copper_ore", &["minecraft:raw_copper"]),
        ("minecraft:gold_ore", &["minecraft:raw_gold"]),
        ("minecraft:redstone_ore", &["minecraft:redstone"]),
        ("minecraft:lapis_ore", &["minecraft:lapis_lazuli"]),
        ("minecraft:diamond_ore", &["minecraft:diamond"]),
        ("minecraft:emerald_ore", &["minecraft:emerald"]),
    ];
    let equivalents = groups
        .iter()
        .map(|(ore, yields)| {
            (
                ore.to_string(),
                yields.iter().map(|item| item.to_string()).collect(),
            )
        })
        .collect::<BTreeMap<_, _>>();
    MaterialClassification {
        equivalents,
        excluded: BTreeSet::from([
            "minecraft:bedrock".to_string(),
            "minecraft:spawner".to_string(),
        ]),
        rare: BTreeSet::from([
            "minecraft:diamond_ore".to_string(),
            "minecraft:emerald_ore".to_string(),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_passes_schema_and_invariants() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("materials.json");
        write_materials(&path, &default_materials()).expect("write");
        let loaded = load_materials(&path).expect("load");
        assert_eq!(loaded, default_materials());
    }

    #[test]
    fn schema_rejects_unknown_keys_and_bad_ids() {
        let err = parse_materials(r#"{"ores": []}"#).unwrap_err();
        assert!(err.to_string().contains("schema validation failed"));

        let err = parse_materials(r#"{"excluded": ["Not An Id"]}"#).unwrap_err();
        assert!(err.to_string().contains("schema validation failed"));
    }

    #[test]
    fn invariants_run_after_schema() {
        let err = parse_materials(r#"{"excluded": ["gem"], "rare": ["gem"]}"#).unwrap_err();
        assert!(err.to_string().contains("both rare and excluded"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let table = parse_materials("{}").expect("parse");
        assert_eq!(table, MaterialClassification::default());
    }
}

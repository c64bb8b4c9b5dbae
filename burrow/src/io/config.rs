//! Agent configuration stored under `.burrow/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::{Axis, Direction, Position};

/// Agent configuration (TOML).
///
/// Edited by humans; missing fields default to values that suit a surface
/// base with a drop chest above and a fuel chest below.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub base: BaseConfig,
    pub fuel: FuelPolicy,
    pub excavation: ExcavationConfig,
    pub driver: DriverConfig,
}

/// Where homing goes and how it gets there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BaseConfig {
    /// Cell the agent occupies while offloading and refuelling.
    pub position: Position,
    /// Layer used for horizontal travel to and from the base.
    pub travel_y: i64,
    /// Horizontal axis travelled first on the way home (reversed outbound).
    pub first_axis: Axis,
    /// Container receiving offloaded items, relative to `position`.
    pub drop_direction: Direction,
    /// Container supplying fuel, relative to `position`.
    pub fuel_direction: Direction,
    /// Materials never offloaded (tools, fuel reserves).
    pub keep: Vec<String>,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            position: Position::ORIGIN,
            travel_y: 0,
            first_axis: Axis::X,
            drop_direction: Direction::Up,
            fuel_direction: Direction::Down,
            keep: Vec::new(),
        }
    }
}

/// Fuel thresholds: when to head home and how much to take on there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FuelPolicy {
    /// Spare moves kept on top of the distance home before turning back.
    pub reserve: u32,
    /// Fuel level the base refuel phase fills up to.
    pub refuel_target: u32,
}

impl Default for FuelPolicy {
    fn default() -> Self {
        Self {
            reserve: 32,
            refuel_target: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExcavationConfig {
    /// Dig-and-retry rounds allowed when a cleared cell refills (gravel, sand).
    pub debris_retries: u32,
}

impl Default for ExcavationConfig {
    fn default() -> Self {
        Self { debris_retries: 16 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DriverConfig {
    /// Stop the driver loop after this many steps per invocation (0 = unlimited).
    pub max_steps: u64,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base.first_axis == Axis::Y {
            return Err(anyhow!("base.first_axis must be \"x\" or \"z\""));
        }
        if self.fuel.refuel_target <= self.fuel.reserve {
            return Err(anyhow!("fuel.refuel_target must be > fuel.reserve"));
        }
        if self.excavation.debris_retries == 0 {
            return Err(anyhow!("excavation.debris_retries must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = AgentConfig::default();
        cfg.base.position = Position::new(4, 64, -9);
        cfg.base.keep = vec!["minecraft:torch".to_string()];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[fuel]\nreserve = 100\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.fuel.reserve, 100);
        assert_eq!(cfg.fuel.refuel_target, 1_000);
        assert_eq!(cfg.base, BaseConfig::default());
    }

    #[test]
    fn rejects_vertical_first_axis() {
        let mut cfg = AgentConfig::default();
        cfg.base.first_axis = Axis::Y;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("first_axis"));
    }
}

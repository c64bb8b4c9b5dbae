//! Case file parsing and validation.
//!
//! Cases are TOML files describing a generated world, a task, config
//! overrides and the checks judged after the run. See `sim/cases/`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use burrow::core::types::{Direction, Position};
use burrow::start::TaskSpec;
use serde::Deserialize;

/// A parsed case file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseFile {
    pub case: CaseMeta,
    pub world: WorldSpec,
    pub task: TaskSection,
    #[serde(default)]
    pub config: CaseConfig,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// Generated world. The agent starts at the base facing north, with the base
/// containers placed in the configured directions.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WorldSpec {
    pub seed: u64,
    /// Opposite corners of the stone fill.
    pub min: Position,
    pub max: Position,
    /// Layer of unbreakable floor under the fill (defaults to `min.y - 1`).
    pub bedrock_y: Option<i64>,
    /// Starting fuel; omit for an agent that needs none.
    pub fuel: Option<u32>,
    #[serde(default = "default_drop_capacity")]
    pub drop_capacity: u32,
    #[serde(default = "default_fuel_stock")]
    pub fuel_stock: u32,
    /// Pockets of gravel that refill once after being dug.
    #[serde(default)]
    pub gravel: u32,
    #[serde(default)]
    pub ores: Vec<OreSpec>,
}

fn default_drop_capacity() -> u32 {
    10_000
}

fn default_fuel_stock() -> u32 {
    100_000
}

/// `veins` random walks of `size` cells of `material`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OreSpec {
    pub material: String,
    pub veins: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskSection {
    Quarry {
        width: u32,
        length: u32,
        depth: u32,
    },
    Branch {
        branches: u32,
        #[serde(default = "default_spacing")]
        spacing: u32,
        length: u32,
    },
}

fn default_spacing() -> u32 {
    3
}

impl TaskSection {
    pub fn spec(&self) -> TaskSpec {
        match *self {
            TaskSection::Quarry {
                width,
                length,
                depth,
            } => TaskSpec::Quarry {
                width,
                length,
                depth,
            },
            TaskSection::Branch {
                branches,
                spacing,
                length,
            } => TaskSpec::BranchMine {
                branches,
                spacing,
                length,
            },
        }
    }
}

/// Agent config overrides for the case.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CaseConfig {
    pub reserve: Option<u32>,
    pub refuel_target: Option<u32>,
    pub debris_retries: Option<u32>,
    pub travel_y: Option<i64>,
    /// Where the base containers sit; also where the world puts them.
    pub drop_direction: Option<Direction>,
    pub fuel_direction: Option<Direction>,
}

/// How the simulator drives the agent.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunSettings {
    /// Restart the driver from the files on disk every this many steps.
    pub crash_every: Option<u64>,
    /// Give up after this many steps in total.
    pub step_budget: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            crash_every: None,
            step_budget: 200_000,
        }
    }
}

/// Verification check judged after the run.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// The task record is finished.
    Completed,
    /// The agent ended at the base cell.
    AtBase,
    /// At least `count` blocks were dug.
    MinedAtLeast { count: u64 },
    /// No dug item was lost for lack of storage.
    NoSpill,
    /// The persisted pose matches where the agent really is.
    PoseTracked,
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        Self::parse_str(&contents).with_context(|| format!("load case {}", path.display()))
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = toml::from_str(contents).context("parse case")?;
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<()> {
        validate_case_id(&self.case.id)?;
        let (min, max) = (self.world.min, self.world.max);
        if min.x > max.x || min.y > max.y || min.z > max.z {
            bail!("world.min must not exceed world.max on any axis");
        }
        if let Some(floor) = self.world.bedrock_y
            && floor > 0
        {
            bail!("world.bedrock_y must be below the base");
        }
        for ore in &self.world.ores {
            if ore.material.trim().is_empty() {
                bail!("world.ores material must be non-empty");
            }
            if ore.size == 0 {
                bail!("world.ores {} size must be > 0", ore.material);
            }
        }
        if self.run.crash_every == Some(0) {
            bail!("run.crash_every must be > 0");
        }
        if self.run.step_budget == 0 {
            bail!("run.step_budget must be > 0");
        }
        if self.checks.is_empty() {
            bail!("checks must be a non-empty array");
        }
        Ok(())
    }
}

/// Discover and load all case files from a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.case.id.cmp(&right.case.id));
    for pair in cases.windows(2) {
        if pair[0].case.id == pair[1].case.id {
            return Err(anyhow!("duplicate case.id {}", pair[0].case.id));
        }
    }
    Ok(cases)
}

fn validate_case_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("case.id must be non-empty");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("case.id must use [a-z0-9_-] only");
    }
    Ok(())
}

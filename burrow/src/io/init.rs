//! Initialization helpers for `.burrow/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{AgentConfig, write_config};
use super::materials::{default_materials, write_materials};
use super::store::{JsonFileStore, StateStore};
use crate::core::types::Pose;

/// All canonical paths within `.burrow/` for an agent root.
#[derive(Debug, Clone)]
pub struct AgentPaths {
    pub root: PathBuf,
    pub agent_dir: PathBuf,
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub materials_path: PathBuf,
    pub pose_path: PathBuf,
    pub task_path: PathBuf,
}

impl AgentPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let agent_dir = root.join(".burrow");
        let state_dir = agent_dir.join("state");
        Self {
            root,
            config_path: agent_dir.join("config.toml"),
            materials_path: agent_dir.join("materials.json"),
            pose_path: state_dir.join("pose.json"),
            task_path: state_dir.join("task.json"),
            agent_dir,
            state_dir,
        }
    }

    pub fn pose_store(&self) -> JsonFileStore<Pose> {
        JsonFileStore::new(&self.pose_path)
    }

    pub fn task_store<T>(&self) -> JsonFileStore<T> {
        JsonFileStore::new(&self.task_path)
    }
}

/// Options for `init_agent`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing agent-owned files.
    pub force: bool,
    /// Pose written to the fresh pose record.
    pub pose: Pose,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            force: false,
            pose: Pose::default(),
        }
    }
}

/// Create `.burrow/` scaffolding in `root`.
///
/// The starting pose doubles as the base: the written config puts the base
/// and the travel altitude at it.
///
/// Fails if `.burrow/` already exists unless `options.force` is set. A forced
/// init also drops any task record, since it was anchored to the old pose.
pub fn init_agent(root: &Path, options: &InitOptions) -> Result<AgentPaths> {
    let paths = AgentPaths::new(root);
    if paths.agent_dir.exists() && !options.force {
        return Err(anyhow!(
            "burrow init: .burrow already exists (use --force to overwrite)"
        ));
    }
    if paths.agent_dir.exists() && !paths.agent_dir.is_dir() {
        return Err(anyhow!("burrow init: .burrow exists but is not a directory"));
    }

    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create directory {}", paths.state_dir.display()))?;
    let mut config = AgentConfig::default();
    config.base.position = options.pose.position;
    config.base.travel_y = options.pose.position.y;
    write_config(&paths.config_path, &config)?;
    write_materials(&paths.materials_path, &default_materials())?;
    paths.pose_store().save(&options.pose)?;
    if paths.task_path.exists() {
        fs::remove_file(&paths.task_path)
            .with_context(|| format!("remove {}", paths.task_path.display()))?;
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Heading, Position};
    use crate::io::config::load_config;
    use crate::io::materials::load_materials;

    #[test]
    fn paths_are_stable() {
        let paths = AgentPaths::new("/agent");
        assert!(paths.config_path.ends_with(".burrow/config.toml"));
        assert!(paths.materials_path.ends_with(".burrow/materials.json"));
        assert!(paths.pose_path.ends_with(".burrow/state/pose.json"));
        assert!(paths.task_path.ends_with(".burrow/state/task.json"));
    }

    #[test]
    fn init_writes_loadable_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let pose = Pose::new(Position::new(10, 64, -3), Heading::East);
        let paths = init_agent(
            temp.path(),
            &InitOptions {
                force: false,
                pose,
            },
        )
        .expect("init");

        let config = load_config(&paths.config_path).expect("config");
        assert_eq!(config.base.position, pose.position);
        assert_eq!(config.base.travel_y, 64);
        load_materials(&paths.materials_path).expect("materials");
        assert_eq!(paths.pose_store().load().expect("pose"), Some(pose));
        assert!(!paths.task_path.exists());
    }

    #[test]
    fn init_refuses_existing_dir_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_agent(temp.path(), &InitOptions::default()).expect("first init");
        let err = init_agent(temp.path(), &InitOptions::default()).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        init_agent(
            temp.path(),
            &InitOptions {
                force: true,
                ..InitOptions::default()
            },
        )
        .expect("forced init");
    }
}

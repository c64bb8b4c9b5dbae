//! Validation of the `.burrow/` layout and everything stored in it.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

use crate::core::types::Pose;
use crate::io::config::load_config;
use crate::io::init::AgentPaths;
use crate::io::materials::load_materials;
use crate::io::store::StateStore;
use crate::tasks::{AnyTask, TaskSummary};

/// What a successful validation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOutcome {
    pub pose: Pose,
    /// `None` until `burrow start` has been run.
    pub task: Option<TaskSummary>,
}

/// Validate layout, config, materials, pose and task record.
pub fn validate_agent(root: &Path) -> Result<ValidateOutcome> {
    let paths = AgentPaths::new(root);

    ensure_dir(&paths.agent_dir)?;
    ensure_dir(&paths.state_dir)?;
    ensure_file(&paths.config_path)?;
    ensure_file(&paths.materials_path)?;
    ensure_file(&paths.pose_path)?;

    load_config(&paths.config_path).with_context(|| "load config.toml")?;
    load_materials(&paths.materials_path).with_context(|| "load materials.json")?;
    let pose = paths
        .pose_store()
        .load()
        .with_context(|| "load pose.json")?
        .ok_or_else(|| anyhow!("missing file {}", paths.pose_path.display()))?;

    let Some(task) = AnyTask::load(&paths.task_path).with_context(|| "load task.json")? else {
        return Ok(ValidateOutcome { pose, task: None });
    };
    let errors = task.check();
    if !errors.is_empty() {
        bail!("task invariant violations:\n- {}", errors.join("\n- "));
    }
    Ok(ValidateOutcome {
        pose,
        task: Some(task.summary()),
    })
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("missing directory {}", path.display()));
    }
    if !path.is_dir() {
        return Err(anyhow!("expected directory {}", path.display()));
    }
    Ok(())
}

fn ensure_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("missing file {}", path.display()));
    }
    if !path.is_file() {
        return Err(anyhow!("expected file {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::core::types::Position;
    use crate::io::init::{InitOptions, init_agent};
    use crate::machine::TaskRecord;
    use crate::start::{TaskSpec, start_task};
    use crate::tasks::quarry::Quarry;

    #[test]
    fn validate_ok_before_start() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_agent(temp.path(), &InitOptions::default()).expect("init");

        let outcome = validate_agent(temp.path()).expect("validate");
        assert_eq!(outcome.pose, Pose::default());
        assert_eq!(outcome.task, None);
    }

    #[test]
    fn validate_reports_started_task() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_agent(temp.path(), &InitOptions::default()).expect("init");
        let spec = TaskSpec::BranchMine {
            branches: 3,
            spacing: 3,
            length: 12,
        };
        start_task(temp.path(), &spec, false).expect("start");

        let outcome = validate_agent(temp.path()).expect("validate");
        let summary = outcome.task.expect("task");
        assert_eq!(summary.kind, "branch_mine");
        assert_eq!(summary.steps, 0);
    }

    #[test]
    fn validate_errors_on_missing_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = validate_agent(temp.path()).expect_err("validate should fail");
        assert!(err.to_string().contains("missing directory"));
    }

    #[test]
    fn validate_errors_on_broken_materials() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_agent(temp.path(), &InitOptions::default()).expect("init");
        fs::write(&paths.materials_path, r#"{"equivalents": 3}"#).expect("write");

        let err = validate_agent(temp.path()).expect_err("validate should fail");
        assert!(format!("{err:#}").contains("materials"));
    }

    #[test]
    fn validate_errors_on_inconsistent_task() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_agent(temp.path(), &InitOptions::default()).expect("init");
        let mut quarry = Quarry::new(Position::ORIGIN, 2, 2, 2).expect("quarry");
        quarry.mined = 99;
        AnyTask::Quarry(TaskRecord::new(quarry))
            .save(&paths.task_path)
            .expect("save");

        let err = validate_agent(temp.path()).expect_err("validate should fail");
        assert!(err.to_string().contains("exceeds"));
    }
}

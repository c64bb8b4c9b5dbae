//! `burrow start`: write a fresh task record anchored at the persisted pose.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::info;

use crate::core::types::Position;
use crate::io::init::AgentPaths;
use crate::io::store::StateStore;
use crate::machine::TaskRecord;
use crate::tasks::AnyTask;
use crate::tasks::branch::BranchMine;
use crate::tasks::quarry::Quarry;

/// Which task to start, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSpec {
    Quarry {
        width: u32,
        length: u32,
        depth: u32,
    },
    BranchMine {
        branches: u32,
        spacing: u32,
        length: u32,
    },
}

impl TaskSpec {
    pub fn build(&self, origin: Position) -> Result<AnyTask> {
        Ok(match *self {
            TaskSpec::Quarry {
                width,
                length,
                depth,
            } => AnyTask::Quarry(TaskRecord::new(Quarry::new(origin, width, length, depth)?)),
            TaskSpec::BranchMine {
                branches,
                spacing,
                length,
            } => AnyTask::BranchMine(TaskRecord::new(BranchMine::new(
                origin, branches, spacing, length,
            )?)),
        })
    }
}

/// Start `spec` at the agent's current persisted position.
///
/// Refuses to replace an unfinished task unless `force` is set.
pub fn start_task(root: &Path, spec: &TaskSpec, force: bool) -> Result<AnyTask> {
    let paths = AgentPaths::new(root);
    if !paths.agent_dir.is_dir() {
        return Err(anyhow!(
            "missing {} (run `burrow init` first)",
            paths.agent_dir.display()
        ));
    }
    if let Some(existing) = AnyTask::load(&paths.task_path).context("load current task")? {
        let summary = existing.summary();
        if !summary.finished && !force {
            bail!(
                "unfinished {} task in phase '{}' (use --force to replace it)",
                summary.kind,
                summary.phase
            );
        }
    }
    let pose = paths
        .pose_store()
        .load()?
        .ok_or_else(|| anyhow!("missing {} (run `burrow init`)", paths.pose_path.display()))?;

    let task = spec.build(pose.position)?;
    task.save(&paths.task_path)?;
    info!(kind = task.summary().kind, origin = %pose.position, "task started");
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Heading, Pose};
    use crate::io::init::{InitOptions, init_agent};

    const QUARRY: TaskSpec = TaskSpec::Quarry {
        width: 3,
        length: 3,
        depth: 2,
    };

    #[test]
    fn start_requires_init() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = start_task(temp.path(), &QUARRY, false).unwrap_err();
        assert!(err.to_string().contains("burrow init"));
    }

    #[test]
    fn start_anchors_task_at_persisted_pose() {
        let temp = tempfile::tempdir().expect("tempdir");
        let pose = Pose::new(Position::new(-4, 12, 9), Heading::South);
        let paths = init_agent(
            temp.path(),
            &InitOptions {
                force: false,
                pose,
            },
        )
        .expect("init");

        let task = start_task(temp.path(), &QUARRY, false).expect("start");
        let AnyTask::Quarry(record) = &task else {
            panic!("expected quarry, got {task:?}");
        };
        assert_eq!(record.task.origin, pose.position);
        assert_eq!(AnyTask::load(&paths.task_path).expect("load"), Some(task));
    }

    #[test]
    fn unfinished_task_needs_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_agent(temp.path(), &InitOptions::default()).expect("init");
        start_task(temp.path(), &QUARRY, false).expect("first");

        let branch = TaskSpec::BranchMine {
            branches: 2,
            spacing: 3,
            length: 10,
        };
        let err = start_task(temp.path(), &branch, false).unwrap_err();
        assert!(err.to_string().contains("--force"));

        let task = start_task(temp.path(), &branch, true).expect("forced");
        assert_eq!(task.summary().kind, "branch_mine");
    }

    #[test]
    fn zero_sized_task_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_agent(temp.path(), &InitOptions::default()).expect("init");
        let spec = TaskSpec::Quarry {
            width: 0,
            length: 1,
            depth: 1,
        };
        assert!(start_task(temp.path(), &spec, false).is_err());
    }
}

//! Concrete tasks, and a kind-tagged view of whichever one is on disk.

pub mod branch;
pub mod quarry;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::core::transition::Fatal;
use crate::io::store::{JsonFileStore, Persisted, StateStore, decode, peek_kind};
use crate::machine::{StepMachine, TaskRecord};

use self::branch::BranchMine;
use self::quarry::Quarry;

/// A step machine that can be started, persisted and reported on.
pub trait Task: StepMachine + Persisted + Clone {
    /// Short human summary of how far along the task is.
    fn progress(&self) -> String;

    /// Semantic problems in a loaded record; empty when consistent.
    fn check(&self) -> Vec<String>;
}

/// Task record of any known kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyTask {
    Quarry(TaskRecord<Quarry>),
    BranchMine(TaskRecord<BranchMine>),
}

/// Printable state of a task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub kind: &'static str,
    pub phase: String,
    pub progress: String,
    pub steps: u64,
    pub halted: Option<Fatal>,
    pub finished: bool,
}

impl AnyTask {
    /// Load the task record at `path`, dispatching on its envelope kind.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let task = match peek_kind(&raw)?.as_deref() {
            Some(Quarry::KIND) => AnyTask::Quarry(decode(&raw)?),
            Some(BranchMine::KIND) => AnyTask::BranchMine(decode(&raw)?),
            Some(other) => bail!("{}: unknown task kind '{other}'", path.display()),
            None => bail!("{}: task record has no kind", path.display()),
        };
        Ok(Some(task))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            AnyTask::Quarry(record) => JsonFileStore::new(path).save(record),
            AnyTask::BranchMine(record) => JsonFileStore::new(path).save(record),
        }
    }

    pub fn summary(&self) -> TaskSummary {
        match self {
            AnyTask::Quarry(record) => summarize(record),
            AnyTask::BranchMine(record) => summarize(record),
        }
    }

    pub fn check(&self) -> Vec<String> {
        match self {
            AnyTask::Quarry(record) => record.task.check(),
            AnyTask::BranchMine(record) => record.task.check(),
        }
    }
}

fn summarize<M: Task>(record: &TaskRecord<M>) -> TaskSummary {
    let phase = serde_json::to_value(record.task.phase())
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", record.task.phase()));
    TaskSummary {
        kind: M::KIND,
        phase,
        progress: record.task.progress(),
        steps: record.steps,
        halted: record.halted.clone(),
        finished: record.finished,
    }
}

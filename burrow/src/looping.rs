//! Driver loop: step the task, persist, repeat.

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use crate::core::materials::MaterialClassification;
use crate::core::transition::{Fatal, Progress};
use crate::core::types::Pose;
use crate::io::actuator::Agent;
use crate::io::config::AgentConfig;
use crate::io::operator::{Acknowledgement, Operator};
use crate::io::store::{Persisted, StateStore};
use crate::machine::{Rig, StepMachine, TaskRecord, apply};
use crate::tracker::PositionTracker;

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// The task finished.
    Complete,
    /// The operator declined to resume after a fatal.
    Aborted { fatal: Fatal },
    /// `driver.max_steps` steps ran in this invocation.
    MaxSteps { limit: u64 },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub steps_executed: u64,
    pub stop: LoopStop,
}

/// Run the persisted task until it finishes, the operator aborts, or the
/// configured step limit is reached.
///
/// The task record is saved exactly once per executed step. A fatal is
/// recorded in the record before the operator is asked, so a restart after
/// an abort asks again before doing anything else. Any store or I/O error
/// stops the loop immediately.
#[instrument(skip_all, fields(kind = M::KIND))]
pub fn run_loop<M, A, S, T, O, F>(
    body: &mut A,
    tracker: &mut PositionTracker<S>,
    tasks: &mut T,
    materials: &MaterialClassification,
    config: &AgentConfig,
    operator: &mut O,
    mut on_step: F,
) -> Result<LoopOutcome>
where
    M: StepMachine + Persisted,
    A: Agent,
    S: StateStore<Pose>,
    T: StateStore<TaskRecord<M>>,
    O: Operator,
    F: FnMut(&TaskRecord<M>),
{
    let mut record = tasks
        .load()?
        .ok_or_else(|| anyhow!("no task record (run `burrow start` first)"))?;
    let limit = config.driver.max_steps;
    let mut steps_executed = 0u64;

    loop {
        if record.finished {
            info!(steps = record.steps, "task complete");
            return Ok(LoopOutcome {
                steps_executed,
                stop: LoopStop::Complete,
            });
        }

        if let Some(fatal) = record.halted.clone() {
            match operator.acknowledge(&fatal)? {
                Acknowledgement::Resume => {
                    info!(%fatal, "operator resumed");
                    record.halted = None;
                    tasks.save(&record)?;
                    continue;
                }
                Acknowledgement::Abort => {
                    info!(%fatal, "operator aborted");
                    return Ok(LoopOutcome {
                        steps_executed,
                        stop: LoopStop::Aborted { fatal },
                    });
                }
            }
        }

        if limit > 0 && steps_executed >= limit {
            return Ok(LoopOutcome {
                steps_executed,
                stop: LoopStop::MaxSteps { limit },
            });
        }

        let before = record.task.phase();
        let transition = {
            let mut rig = Rig::new(&mut *body, &mut *tracker, materials, config);
            record.task.step(&mut rig)?
        };
        match apply(&mut record.task, transition) {
            Progress::Running(after) if after != before => {
                info!(from = ?before, to = ?after, "phase change");
            }
            Progress::Running(_) => {}
            Progress::Finished => record.finished = true,
            Progress::Halted(fatal) => {
                warn!(phase = ?before, %fatal, "task halted");
                record.halted = Some(fatal);
            }
        }
        record.steps += 1;
        tasks.save(&record)?;
        steps_executed += 1;
        on_step(&record);
    }
}

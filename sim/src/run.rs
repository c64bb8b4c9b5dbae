//! Case execution orchestration.
//!
//! Scaffolds an agent directory, generates the world, drives the task from
//! the files on disk (restarting on the case's crash interval), then judges
//! and records the result.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burrow::core::transition::Fatal;
use burrow::core::types::{Heading, Pose, Position};
use burrow::io::config::{AgentConfig, load_config, write_config};
use burrow::io::init::{AgentPaths, InitOptions, init_agent};
use burrow::io::materials::load_materials;
use burrow::io::operator::{ConsoleOperator, Operator};
use burrow::io::store::StateStore;
use burrow::looping::{LoopStop, run_loop};
use burrow::machine::TaskRecord;
use burrow::start::{TaskSpec, start_task};
use burrow::tasks::branch::BranchMine;
use burrow::tasks::quarry::Quarry;
use burrow::tasks::{AnyTask, Task};
use burrow::test_support::{GridWorld, ScriptedOperator};
use burrow::tracker::PositionTracker;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::case::{CaseFile, RunSettings};
use crate::config::apply_case_config;
use crate::judge::{run_checks, write_judgment};
use crate::outcome::{Outcome, classify_outcome};
use crate::results::{CaptureInput, capture_results, update_outcome};
use crate::world::generate;

/// Result of running a single case.
#[derive(Debug)]
pub struct RunOutcome {
    pub sim_run_id: String,
    pub results_dir: PathBuf,
    pub outcome: Outcome,
}

/// Why the simulated drive ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SimStop {
    Complete,
    Aborted { fatal: Fatal },
    BudgetExhausted { budget: u64 },
}

/// Everything the checks look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimReport {
    pub stop: SimStop,
    pub steps: u64,
    /// Driver invocations; more than one means the agent was restarted.
    pub invocations: u64,
    pub finished: bool,
    pub base: Position,
    /// Where the agent really ended up.
    pub actual_pose: Pose,
    /// Where the agent's pose record says it is.
    pub tracked_pose: Pose,
    pub mined: u64,
    pub spilled: u32,
}

/// Run a case end-to-end: scaffolding, world, drive, checks, result capture.
#[instrument(skip_all, fields(case_id = %case.case.id))]
pub fn run_case(repo_root: &Path, case: &CaseFile, interactive: bool) -> Result<RunOutcome> {
    info!("case run started");
    let started_at = Utc::now();
    let sim_run_id = format!("sim-{}", started_at.format("%Y%m%d_%H%M%S_%3f"));

    let workspace = repo_root
        .join("sim")
        .join("workspaces")
        .join(&case.case.id)
        .join(&sim_run_id);
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("create {}", workspace.display()))?;

    let config = apply_case_config(AgentConfig::default(), &case.config)?;
    let paths = init_agent(
        &workspace,
        &InitOptions {
            force: true,
            pose: Pose::new(config.base.position, Heading::North),
        },
    )
    .context("init agent")?;
    write_config(&paths.config_path, &config).context("write agent config")?;
    let spec = case.task.spec();
    start_task(&workspace, &spec, true).context("start task")?;

    let mut world = generate(&case.world, &config);
    debug!(seed = case.world.seed, "world ready");

    let report = if interactive {
        drive_task(&spec, &paths, &mut world, &case.run, &mut console_operator())?
    } else {
        drive_task(
            &spec,
            &paths,
            &mut world,
            &case.run,
            &mut ScriptedOperator::default(),
        )?
    };
    let finished_at = Utc::now();
    info!(
        stop = ?report.stop,
        steps = report.steps,
        invocations = report.invocations,
        "drive finished"
    );

    let capture = CaptureInput {
        case_id: &case.case.id,
        sim_run_id: &sim_run_id,
        seed: case.world.seed,
        started_at,
        finished_at,
        report: &report,
        paths: &paths,
    };
    let results_dir = capture_results(&repo_root.join("sim").join("results"), &capture)
        .context("capture results")?;

    let judgment = run_checks(&case.checks, &report);
    write_judgment(&results_dir.join("checks.json"), &judgment).context("write checks")?;

    let outcome = classify_outcome(&report.stop, &judgment);
    update_outcome(&results_dir, outcome).context("update outcome")?;
    info!(outcome = ?outcome, results_dir = %results_dir.display(), "case run complete");

    Ok(RunOutcome {
        sim_run_id,
        results_dir,
        outcome,
    })
}

fn drive_task<O: Operator>(
    spec: &TaskSpec,
    paths: &AgentPaths,
    world: &mut GridWorld,
    settings: &RunSettings,
    operator: &mut O,
) -> Result<SimReport> {
    match spec {
        TaskSpec::Quarry { .. } => drive::<Quarry, O>(paths, world, settings, operator),
        TaskSpec::BranchMine { .. } => drive::<BranchMine, O>(paths, world, settings, operator),
    }
}

/// Drive the task in `paths` until it stops for good.
///
/// Every invocation rebuilds config, materials, tracker and task from disk,
/// the way a restarted agent would.
fn drive<M: Task, O: Operator>(
    paths: &AgentPaths,
    world: &mut GridWorld,
    settings: &RunSettings,
    operator: &mut O,
) -> Result<SimReport> {
    let mut steps = 0u64;
    let mut invocations = 0u64;
    let stop = loop {
        let mut config = load_config(&paths.config_path)?;
        let materials = load_materials(&paths.materials_path)?;
        let remaining = settings.step_budget.saturating_sub(steps);
        config.driver.max_steps = settings
            .crash_every
            .map_or(remaining, |every| every.min(remaining));
        let mut tracker = PositionTracker::load(paths.pose_store())?;
        let mut tasks = paths.task_store::<TaskRecord<M>>();

        invocations += 1;
        let outcome = run_loop(
            &mut *world,
            &mut tracker,
            &mut tasks,
            &materials,
            &config,
            &mut *operator,
            |record| {
                if record.steps % 1_000 == 0 {
                    debug!(steps = record.steps, progress = %record.task.progress(), "progress");
                }
            },
        )?;
        steps += outcome.steps_executed;

        match outcome.stop {
            LoopStop::Complete => break SimStop::Complete,
            LoopStop::Aborted { fatal } => break SimStop::Aborted { fatal },
            LoopStop::MaxSteps { .. } if steps >= settings.step_budget => {
                break SimStop::BudgetExhausted {
                    budget: settings.step_budget,
                };
            }
            LoopStop::MaxSteps { .. } => debug!(steps, invocations, "restarting driver"),
        }
    };

    let finished = AnyTask::load(&paths.task_path)?
        .map(|task| task.summary().finished)
        .unwrap_or(false);
    let tracked_pose = paths.pose_store().load()?.unwrap_or_default();
    let config = load_config(&paths.config_path)?;
    Ok(SimReport {
        stop,
        steps,
        invocations,
        finished,
        base: config.base.position,
        actual_pose: world.pose(),
        tracked_pose,
        mined: world.mined().len() as u64,
        spilled: world.spilled(),
    })
}

/// Prompt on stderr so stdout stays parseable.
fn console_operator() -> ConsoleOperator<impl BufRead, impl Write> {
    ConsoleOperator::new(io::stdin().lock(), io::stderr())
}

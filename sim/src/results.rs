//! Result capture and persistence.
//!
//! Copies the agent's final state files next to a `meta.json` describing the
//! run, under `sim/results/<case>/<run>/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burrow::io::init::AgentPaths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::outcome::Outcome;
use crate::run::SimReport;

/// Input for capturing results from a finished run.
#[derive(Debug)]
pub struct CaptureInput<'a> {
    pub case_id: &'a str,
    pub sim_run_id: &'a str,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub report: &'a SimReport,
    pub paths: &'a AgentPaths,
}

/// Metadata for a simulated run, persisted to `meta.json`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimMeta {
    pub case_id: String,
    pub sim_run_id: String,
    pub seed: u64,
    pub outcome: Option<Outcome>,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    pub report: SimReport,
    pub workspace: String,
    /// Non-fatal errors encountered during capture.
    pub errors: Vec<String>,
}

/// Capture results from a finished run to the results directory.
#[instrument(skip_all, fields(case_id = %input.case_id, sim_run_id = %input.sim_run_id))]
pub fn capture_results(base_dir: &Path, input: &CaptureInput<'_>) -> Result<PathBuf> {
    let results_dir = results_dir(base_dir, input.case_id, input.sim_run_id);
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("create results dir {}", results_dir.display()))?;

    let mut errors = Vec::new();
    copy_if_exists(
        &input.paths.pose_path,
        &results_dir.join("pose.json"),
        "pose.json",
        &mut errors,
    );
    copy_if_exists(
        &input.paths.task_path,
        &results_dir.join("task.json"),
        "task.json",
        &mut errors,
    );
    copy_if_exists(
        &input.paths.config_path,
        &results_dir.join("config.toml"),
        "config.toml",
        &mut errors,
    );
    if !errors.is_empty() {
        warn!(errors = ?errors, "artifact capture had errors");
    }

    let duration = input.finished_at - input.started_at;
    let meta = SimMeta {
        case_id: input.case_id.to_string(),
        sim_run_id: input.sim_run_id.to_string(),
        seed: input.seed,
        outcome: None,
        start_time: input.started_at.to_rfc3339(),
        end_time: input.finished_at.to_rfc3339(),
        duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        report: input.report.clone(),
        workspace: input.paths.root.display().to_string(),
        errors,
    };

    write_meta(&results_dir.join("meta.json"), &meta)?;
    debug!(results_dir = %results_dir.display(), "results captured");
    Ok(results_dir)
}

pub fn update_outcome(results_dir: &Path, outcome: Outcome) -> Result<()> {
    let meta_path = results_dir.join("meta.json");
    let mut meta: SimMeta = serde_json::from_str(
        &fs::read_to_string(&meta_path).with_context(|| format!("read {}", meta_path.display()))?,
    )
    .context("parse meta")?;
    meta.outcome = Some(outcome);
    write_meta(&meta_path, &meta)?;
    Ok(())
}

pub fn results_dir(base_dir: &Path, case_id: &str, sim_run_id: &str) -> PathBuf {
    base_dir.join(case_id).join(sim_run_id)
}

fn write_meta(path: &Path, meta: &SimMeta) -> Result<()> {
    let contents = serde_json::to_string_pretty(meta).context("serialize meta")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write meta {}", path.display()))?;
    Ok(())
}

fn copy_if_exists(src: &Path, dst: &Path, label: &str, errors: &mut Vec<String>) {
    if !src.exists() {
        errors.push(format!("{label}: missing {}", src.display()));
        return;
    }
    if let Err(err) = fs::copy(src, dst) {
        errors.push(format!("{label}: copy failed: {err}"));
    }
}

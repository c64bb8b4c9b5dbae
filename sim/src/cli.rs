//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::case::{CaseFile, discover_cases};
use crate::run::run_case;

/// List all available cases.
pub fn list_cases(repo_root: &Path) -> Result<()> {
    let cases_dir = repo_root.join("sim").join("cases");
    for case in discover_cases(&cases_dir)? {
        if case.case.description.is_empty() {
            println!("{}", case.case.id);
        } else {
            println!("{}\t{}", case.case.id, case.case.description);
        }
    }
    Ok(())
}

/// Run a case by id (optionally multiple times).
pub fn run_case_by_id(repo_root: &Path, case_id: &str, runs: u32, interactive: bool) -> Result<()> {
    let case_path = repo_root
        .join("sim")
        .join("cases")
        .join(format!("{case_id}.toml"));
    if !case_path.exists() {
        bail!("case {} not found at {}", case_id, case_path.display());
    }
    let case = CaseFile::load(&case_path).context("load case")?;
    debug!(case_id, runs, "case loaded");

    info!(case_id, runs, "starting runs");
    for run_num in 1..=runs {
        debug!(case_id, run_num, runs, "starting run");
        let outcome = run_case(repo_root, &case, interactive).context("run case")?;
        println!(
            "run: case={} sim_run_id={} outcome={:?} results={}",
            case_id,
            outcome.sim_run_id,
            outcome.outcome,
            outcome.results_dir.display()
        );
    }
    Ok(())
}

/// Remove workspaces and results for a case.
pub fn clean_case(repo_root: &Path, case_id: &str) -> Result<()> {
    let workspaces = repo_root.join("sim").join("workspaces").join(case_id);
    let results = repo_root.join("sim").join("results").join(case_id);
    for dir in [&workspaces, &results] {
        if dir.exists() {
            std::fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
        }
    }
    println!(
        "clean: case={} workspaces={} results={}",
        case_id,
        workspaces.display(),
        results.display()
    );
    Ok(())
}

//! Check evaluation against a finished simulation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use burrow::core::types::{Pose, Position};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::case::Check;
use crate::run::SimReport;

/// Collected check outcomes for a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct Judgment {
    pub checks: Vec<CheckOutcome>,
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckOutcome {
    Completed {
        passed: bool,
    },
    AtBase {
        passed: bool,
        position: Position,
        base: Position,
    },
    MinedAtLeast {
        passed: bool,
        expected: u64,
        actual: u64,
    },
    NoSpill {
        passed: bool,
        spilled: u32,
    },
    PoseTracked {
        passed: bool,
        tracked: Pose,
        actual: Pose,
    },
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        match self {
            CheckOutcome::Completed { passed }
            | CheckOutcome::AtBase { passed, .. }
            | CheckOutcome::MinedAtLeast { passed, .. }
            | CheckOutcome::NoSpill { passed, .. }
            | CheckOutcome::PoseTracked { passed, .. } => *passed,
        }
    }
}

/// Evaluate every check against `report`.
#[instrument(skip_all, fields(check_count = checks.len()))]
pub fn run_checks(checks: &[Check], report: &SimReport) -> Judgment {
    let outcomes = checks
        .iter()
        .map(|check| {
            let outcome = judge(check, report);
            if outcome.passed() {
                debug!(?check, "check passed");
            } else {
                warn!(?outcome, "check failed");
            }
            outcome
        })
        .collect();
    Judgment { checks: outcomes }
}

fn judge(check: &Check, report: &SimReport) -> CheckOutcome {
    match check {
        Check::Completed => CheckOutcome::Completed {
            passed: report.finished,
        },
        Check::AtBase => CheckOutcome::AtBase {
            passed: report.actual_pose.position == report.base,
            position: report.actual_pose.position,
            base: report.base,
        },
        Check::MinedAtLeast { count } => CheckOutcome::MinedAtLeast {
            passed: report.mined >= *count,
            expected: *count,
            actual: report.mined,
        },
        Check::NoSpill => CheckOutcome::NoSpill {
            passed: report.spilled == 0,
            spilled: report.spilled,
        },
        Check::PoseTracked => CheckOutcome::PoseTracked {
            passed: report.tracked_pose == report.actual_pose,
            tracked: report.tracked_pose,
            actual: report.actual_pose,
        },
    }
}

pub fn write_judgment(path: &Path, judgment: &Judgment) -> Result<()> {
    let contents = serde_json::to_string_pretty(judgment).context("serialize checks")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::SimStop;
    use burrow::core::types::Heading;

    fn report() -> SimReport {
        let pose = Pose::new(Position::ORIGIN, Heading::East);
        SimReport {
            stop: SimStop::Complete,
            steps: 120,
            invocations: 4,
            finished: true,
            base: Position::ORIGIN,
            actual_pose: pose,
            tracked_pose: pose,
            mined: 30,
            spilled: 0,
        }
    }

    #[test]
    fn all_checks_pass_on_a_clean_run() {
        let checks = [
            Check::Completed,
            Check::AtBase,
            Check::MinedAtLeast { count: 30 },
            Check::NoSpill,
            Check::PoseTracked,
        ];
        let judgment = run_checks(&checks, &report());
        assert!(judgment.checks.iter().all(CheckOutcome::passed));
    }

    #[test]
    fn drift_and_shortfall_fail() {
        let mut report = report();
        report.tracked_pose = Pose::new(Position::new(1, 0, 0), Heading::East);
        report.spilled = 3;
        let judgment = run_checks(
            &[
                Check::PoseTracked,
                Check::MinedAtLeast { count: 31 },
                Check::NoSpill,
            ],
            &report,
        );
        assert!(judgment.checks.iter().all(|outcome| !outcome.passed()));
        assert_eq!(
            judgment.checks[1],
            CheckOutcome::MinedAtLeast {
                passed: false,
                expected: 31,
                actual: 30
            }
        );
    }

    #[test]
    fn judgment_serializes_with_type_tags() {
        let judgment = run_checks(&[Check::NoSpill], &report());
        let value = serde_json::to_value(&judgment).expect("json");
        assert_eq!(value["checks"][0]["type"], "no_spill");
        assert_eq!(value["checks"][0]["passed"], true);
    }
}

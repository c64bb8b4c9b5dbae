use serde::{Deserialize, Serialize};

use crate::judge::{CheckOutcome, Judgment};
use crate::run::SimStop;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Fail,
    Halted,
    Error,
}

pub fn classify_outcome(stop: &SimStop, judgment: &Judgment) -> Outcome {
    match stop {
        SimStop::Complete => {
            if judgment.checks.iter().all(CheckOutcome::passed) {
                Outcome::Success
            } else {
                Outcome::Fail
            }
        }
        SimStop::Aborted { .. } => Outcome::Halted,
        SimStop::BudgetExhausted { .. } => Outcome::Error,
    }
}

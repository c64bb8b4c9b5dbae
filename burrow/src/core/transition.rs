//! Step outcomes and phase ordering for persistent state machines.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A named state of a task with a fixed ordering used by [`Transition::Advance`].
pub trait Phase: Copy + Eq + fmt::Debug + Serialize + DeserializeOwned + 'static {
    /// Phases in advance order.
    const ORDER: &'static [Self];
    /// Wrap from the last phase back to the first instead of finishing.
    const CYCLIC: bool = false;

    /// Phase that follows `self`, or `None` when a non-cyclic machine finishes.
    fn successor(self) -> Option<Self> {
        let index = Self::ORDER.iter().position(|phase| *phase == self)?;
        match Self::ORDER.get(index + 1) {
            Some(next) => Some(*next),
            None if Self::CYCLIC => Self::ORDER.first().copied(),
            None => None,
        }
    }
}

/// Result of one bounded unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<P> {
    /// Move to the next phase in [`Phase::ORDER`].
    Advance,
    /// Stay in the current phase and run it again next iteration.
    Retry,
    /// Move directly to a named phase.
    Jump(P),
    /// Halt automatic progress until an operator acknowledges.
    Fatal(Fatal),
}

/// What the driver should do after applying a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress<P> {
    Running(P),
    Finished,
    Halted(Fatal),
}

/// Apply `transition` to `current`.
pub fn next_phase<P: Phase>(current: P, transition: Transition<P>) -> Progress<P> {
    match transition {
        Transition::Advance => match current.successor() {
            Some(next) => Progress::Running(next),
            None => Progress::Finished,
        },
        Transition::Retry => Progress::Running(current),
        Transition::Jump(target) => Progress::Running(target),
        Transition::Fatal(fatal) => Progress::Halted(fatal),
    }
}

/// Condition that needs an operator before automatic progress resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalKind {
    /// The offload container accepted nothing while items remained.
    ReceptacleFull,
    /// The fuel source yielded nothing while below the refuel target.
    NoFuel,
    /// A travel or backtrack move stayed blocked after digging.
    PathBlocked,
    /// Digging through an obstruction was refused for lack of storage.
    StorageJammed,
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FatalKind::ReceptacleFull => "receptacle full",
            FatalKind::NoFuel => "no fuel",
            FatalKind::PathBlocked => "path blocked",
            FatalKind::StorageJammed => "storage jammed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fatal {
    pub kind: FatalKind,
    pub detail: String,
}

impl Fatal {
    pub fn new(kind: FatalKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    enum Linear {
        A,
        B,
    }

    impl Phase for Linear {
        const ORDER: &'static [Self] = &[Linear::A, Linear::B];
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    enum Cycle {
        Sow,
        Reap,
    }

    impl Phase for Cycle {
        const ORDER: &'static [Self] = &[Cycle::Sow, Cycle::Reap];
        const CYCLIC: bool = true;
    }

    #[test]
    fn advance_walks_order_then_finishes() {
        assert_eq!(
            next_phase(Linear::A, Transition::Advance),
            Progress::Running(Linear::B)
        );
        assert_eq!(next_phase(Linear::B, Transition::Advance), Progress::Finished);
    }

    #[test]
    fn cyclic_machines_wrap() {
        assert_eq!(
            next_phase(Cycle::Reap, Transition::Advance),
            Progress::Running(Cycle::Sow)
        );
    }

    #[test]
    fn retry_and_jump() {
        assert_eq!(
            next_phase(Linear::B, Transition::Retry),
            Progress::Running(Linear::B)
        );
        assert_eq!(
            next_phase(Linear::B, Transition::Jump(Linear::A)),
            Progress::Running(Linear::A)
        );
    }

    #[test]
    fn fatal_halts() {
        let fatal = Fatal::new(FatalKind::NoFuel, "fuel chest empty");
        assert_eq!(
            next_phase(Linear::A, Transition::Fatal(fatal.clone())),
            Progress::Halted(fatal)
        );
    }
}

//! Branch mining: parallel corridors off a main north-bound corridor, with
//! every tunnelled cell scanned for ore veins.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::invariants::validate_path_stack;
use crate::core::transition::{Fatal, FatalKind, Phase, Progress, Transition};
use crate::core::types::{Axis, Direction, Pose, Position};
use crate::excavator::{Travel, Tunnel};
use crate::homing::HomingSequencer;
use crate::io::actuator::Agent;
use crate::io::store::{Persisted, StateStore};
use crate::machine::{Rig, StepMachine, apply};
use crate::tasks::Task;
use crate::vein::{VeinExplorer, VeinPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchPhase {
    #[default]
    Approach,
    Tunnel,
    Scan,
    Homing,
    Finish,
    Complete,
}

impl Phase for BranchPhase {
    const ORDER: &'static [Self] = &[
        BranchPhase::Approach,
        BranchPhase::Tunnel,
        BranchPhase::Scan,
        BranchPhase::Homing,
        BranchPhase::Finish,
        BranchPhase::Complete,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchMine {
    #[serde(default)]
    pub phase: BranchPhase,
    pub origin: Position,
    pub branches: u32,
    pub spacing: u32,
    pub length: u32,
    /// Branch being worked on.
    #[serde(default)]
    pub branch: u32,
    /// Cells tunnelled into the current branch.
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub vein: VeinExplorer,
    #[serde(default)]
    pub homing: HomingSequencer<BranchPhase>,
}

impl Persisted for BranchMine {
    const KIND: &'static str = "branch_mine";
    const VERSION: u32 = 1;
}

impl BranchMine {
    pub fn new(origin: Position, branches: u32, spacing: u32, length: u32) -> Result<Self> {
        if branches == 0 || spacing == 0 || length == 0 {
            bail!(
                "branch mine needs positive branches, spacing and length \
                 (got {branches}, {spacing}, {length})"
            );
        }
        Ok(Self {
            phase: BranchPhase::Approach,
            origin,
            branches,
            spacing,
            length,
            branch: 0,
            progress: 0,
            vein: VeinExplorer::default(),
            homing: HomingSequencer::default(),
        })
    }

    /// Even branches run east, odd ones west.
    pub fn direction(branch: u32) -> Direction {
        if branch % 2 == 0 {
            Direction::East
        } else {
            Direction::West
        }
    }

    /// Cell `progress` steps into `branch`; progress 0 is the junction.
    pub fn cell(&self, branch: u32, progress: u32) -> Position {
        let junction_z =
            self.origin.z - (i64::from(branch) + 1) * i64::from(self.spacing);
        let along = i64::from(progress) * Self::direction(branch).sign();
        Position::new(self.origin.x + along, self.origin.y, junction_z)
    }

    fn current(&self) -> Position {
        self.cell(self.branch, self.progress)
    }

    fn go_home(&mut self, resume: BranchPhase) -> Transition<BranchPhase> {
        self.homing.arm(resume);
        Transition::Jump(BranchPhase::Homing)
    }

    fn approach<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<BranchPhase>> {
        let target = self.current();
        let here = rig.position();
        // Along the branch first, then the main corridor.
        let Some(axis) = [Axis::X, Axis::Z, Axis::Y]
            .into_iter()
            .find(|axis| here.get(*axis) != target.get(*axis))
        else {
            debug!(branch = self.branch, progress = self.progress, "at branch cell");
            return Ok(Transition::Jump(BranchPhase::Scan));
        };
        if rig.fuel_low() {
            return Ok(self.go_home(BranchPhase::Approach));
        }
        Ok(match rig.travel_axis(axis, target.get(axis))? {
            Travel::Reached => Transition::Retry,
            Travel::StorageFull => self.go_home(BranchPhase::Approach),
            Travel::Blocked => Transition::Fatal(Fatal::new(
                FatalKind::PathBlocked,
                format!("cannot reach branch {} cell {target}", self.branch),
            )),
        })
    }

    fn tunnel<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<BranchPhase>> {
        let here = rig.position();
        if self.progress < self.length && here == self.cell(self.branch, self.progress + 1) {
            self.progress += 1;
            return Ok(Transition::Jump(BranchPhase::Scan));
        }
        if here != self.current() {
            debug!(%here, expected = %self.current(), "off the branch, approaching");
            return Ok(Transition::Jump(BranchPhase::Approach));
        }
        if self.progress >= self.length {
            if self.branch + 1 < self.branches {
                info!(branch = self.branch, "branch done");
                self.branch += 1;
                self.progress = 0;
                return Ok(Transition::Jump(BranchPhase::Approach));
            }
            info!(branches = self.branches, "all branches done");
            return Ok(Transition::Jump(BranchPhase::Finish));
        }
        if rig.fuel_low() {
            return Ok(self.go_home(BranchPhase::Tunnel));
        }
        Ok(match rig.tunnel(Self::direction(self.branch))? {
            Tunnel::Moved => {
                self.progress += 1;
                Transition::Jump(BranchPhase::Scan)
            }
            Tunnel::StorageFull => self.go_home(BranchPhase::Tunnel),
            Tunnel::Blocked => {
                warn!(
                    branch = self.branch,
                    progress = self.progress,
                    "branch blocked, cutting it short"
                );
                self.progress = self.length;
                Transition::Retry
            }
        })
    }

    fn scan<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<BranchPhase>> {
        let transition = self.vein.step(rig)?;
        Ok(match apply(&mut self.vein, transition) {
            Progress::Running(VeinPhase::Stalled) => {
                self.vein.unstall();
                self.go_home(BranchPhase::Scan)
            }
            Progress::Running(_) => Transition::Retry,
            Progress::Finished => {
                self.vein = VeinExplorer::default();
                Transition::Jump(BranchPhase::Tunnel)
            }
            Progress::Halted(fatal) => Transition::Fatal(fatal),
        })
    }

    fn home<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<BranchPhase>> {
        let transition = self.homing.step(rig)?;
        Ok(match apply(&mut self.homing, transition) {
            Progress::Running(_) => Transition::Retry,
            Progress::Finished => {
                Transition::Jump(self.homing.finish().unwrap_or(BranchPhase::Approach))
            }
            Progress::Halted(fatal) => Transition::Fatal(fatal),
        })
    }
}

impl StepMachine for BranchMine {
    type Phase = BranchPhase;

    fn phase(&self) -> BranchPhase {
        self.phase
    }

    fn enter(&mut self, phase: BranchPhase) {
        self.phase = phase;
    }

    fn step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<BranchPhase>> {
        match self.phase {
            BranchPhase::Approach => self.approach(rig),
            BranchPhase::Tunnel => self.tunnel(rig),
            BranchPhase::Scan => self.scan(rig),
            BranchPhase::Homing => self.home(rig),
            BranchPhase::Finish => {
                self.homing.arm_final(BranchPhase::Complete);
                Ok(Transition::Jump(BranchPhase::Homing))
            }
            BranchPhase::Complete => Ok(Transition::Advance),
        }
    }
}

impl Task for BranchMine {
    fn progress(&self) -> String {
        format!(
            "branch {}/{}, {}/{} cells, vein depth {}",
            (self.branch + 1).min(self.branches),
            self.branches,
            self.progress,
            self.length,
            self.vein.path.len()
        )
    }

    fn check(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.branches == 0 || self.spacing == 0 || self.length == 0 {
            errors.push("branches, spacing and length must be positive".to_string());
        }
        if self.branch >= self.branches.max(1) {
            errors.push(format!(
                "branch {} out of range (branches = {})",
                self.branch, self.branches
            ));
        }
        if self.progress > self.length {
            errors.push(format!(
                "progress {} exceeds branch length {}",
                self.progress, self.length
            ));
        }
        if self.vein.depth > self.vein.path.len() {
            errors.push(format!(
                "vein depth {} exceeds path length {}",
                self.vein.depth,
                self.vein.path.len()
            ));
        }
        errors.extend(validate_path_stack(&self.vein.path));
        errors
    }
}

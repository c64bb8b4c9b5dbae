//! Depth-first exploration of a contiguous ore vein.
//!
//! Every expansion is one unit move recorded on a [`PathStack`] before the
//! cell is dug; the agent backtracks by replaying the recorded origins in
//! reverse. The stack is empty exactly when the agent stands at the cell
//! where exploration began. When storage or fuel runs short the agent
//! withdraws to that cell with the stack kept, and walks it out again after
//! the base trip.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::path_stack::{PathEntry, PathStack};
use crate::core::transition::{Fatal, FatalKind, Phase, Transition};
use crate::core::types::{Direction, Pose, Position};
use crate::excavator::{Cell, Travel, Tunnel};
use crate::io::actuator::Agent;
use crate::io::store::StateStore;
use crate::machine::{Rig, StepMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VeinPhase {
    #[default]
    Probe,
    Enter,
    Backtrack,
    /// Walking back to the entry along the path, which is kept.
    Withdraw,
    /// At the entry, needs a trip to base before it can go on.
    Stalled,
    /// Walking the kept path out again after a base trip.
    Rejoin,
}

impl Phase for VeinPhase {
    const ORDER: &'static [Self] = &[VeinPhase::Probe, VeinPhase::Enter, VeinPhase::Backtrack];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VeinExplorer {
    pub phase: VeinPhase,
    pub path: PathStack,
    /// Index into [`Direction::PROBE_ORDER`] of the next neighbour to look at.
    pub probe: usize,
    /// Path entries walked so far while withdrawing or rejoining.
    pub depth: usize,
}

impl VeinExplorer {
    pub fn is_stalled(&self) -> bool {
        self.phase == VeinPhase::Stalled
    }

    /// Continue after a base trip from the vein entry; the path is walked out again.
    pub fn unstall(&mut self) {
        if self.is_stalled() {
            self.depth = 0;
            self.phase = VeinPhase::Rejoin;
        }
    }

    fn withdraw(&mut self) -> Transition<VeinPhase> {
        self.depth = self.path.len();
        Transition::Jump(VeinPhase::Withdraw)
    }

    fn probe_step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<VeinPhase>> {
        let Some(&direction) = Direction::PROBE_ORDER.get(self.probe) else {
            return Ok(Transition::Jump(VeinPhase::Backtrack));
        };
        if rig.fuel_low() {
            warn!(position = %rig.position(), "fuel low inside vein");
            return Ok(self.withdraw());
        }
        let Cell::Solid(material) = rig.probe(direction)? else {
            self.probe += 1;
            return Ok(Transition::Retry);
        };
        let materials = rig.materials();
        let in_rare_cell = self.path.top().is_some_and(|entry| entry.rare);
        let expandable = materials.is_desirable(&material)
            || (in_rare_cell && !materials.is_excluded(&material));
        if !expandable {
            self.probe += 1;
            return Ok(Transition::Retry);
        }
        if !rig.has_room(&material) {
            warn!(%material, %direction, "no storage room inside vein");
            return Ok(self.withdraw());
        }
        // Enter digs; the entry must be on record before the cell is gone.
        let entry = PathEntry::expansion(rig.position(), direction, materials.is_rare(&material));
        debug!(%material, %direction, depth = self.path.len() + 1, "vein expands");
        self.path.push(entry);
        Ok(Transition::Advance)
    }

    fn enter_step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<VeinPhase>> {
        let Some(entry) = self.path.top().copied() else {
            return Ok(Transition::Jump(VeinPhase::Backtrack));
        };
        // A move confirmed before the last persist already landed us there.
        if rig.position().get(entry.axis) == entry.target {
            self.probe = 0;
            return Ok(Transition::Jump(VeinPhase::Probe));
        }
        match rig.tunnel(entry.forward())? {
            Tunnel::Moved => {
                self.probe = 0;
                Ok(Transition::Jump(VeinPhase::Probe))
            }
            Tunnel::Blocked => {
                warn!(direction = %entry.forward(), "vein cell unreachable, dropping it");
                self.path.pop();
                self.probe += 1;
                Ok(Transition::Jump(VeinPhase::Probe))
            }
            Tunnel::StorageFull => {
                self.path.pop();
                Ok(self.withdraw())
            }
        }
    }

    fn backtrack_step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<VeinPhase>> {
        let Some(entry) = self.path.top().copied() else {
            info!(position = %rig.position(), "vein exhausted");
            return Ok(Transition::Advance);
        };
        let reached = rig.move_to_axis(entry.axis, entry.origin)?;
        if reached != entry.origin {
            return Ok(Transition::Fatal(blocked(entry, entry.origin, rig.position())));
        }
        self.path.pop();
        self.probe = 0;
        Ok(Transition::Jump(VeinPhase::Probe))
    }

    fn withdraw_step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<VeinPhase>> {
        let Some(entry) = self
            .depth
            .checked_sub(1)
            .and_then(|index| self.path.entries().get(index).copied())
        else {
            info!(position = %rig.position(), depth = self.path.len(), "back at vein entry");
            return Ok(Transition::Jump(VeinPhase::Stalled));
        };
        let reached = rig.move_to_axis(entry.axis, entry.origin)?;
        if reached != entry.origin {
            return Ok(Transition::Fatal(blocked(entry, entry.origin, rig.position())));
        }
        self.depth -= 1;
        Ok(Transition::Retry)
    }

    fn rejoin_step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<VeinPhase>> {
        let Some(entry) = self.path.entries().get(self.depth).copied() else {
            debug!(position = %rig.position(), "rejoined vein");
            return Ok(Transition::Jump(VeinPhase::Probe));
        };
        match rig.travel_axis(entry.axis, entry.target)? {
            Travel::Reached => {
                self.depth += 1;
                Ok(Transition::Retry)
            }
            Travel::Blocked => Ok(Transition::Fatal(blocked(
                entry,
                entry.target,
                rig.position(),
            ))),
            Travel::StorageFull => Ok(Transition::Fatal(Fatal::new(
                FatalKind::StorageJammed,
                format!("no room to clear the vein path at {}", rig.position()),
            ))),
        }
    }
}

fn blocked(entry: PathEntry, coordinate: i64, here: Position) -> Fatal {
    Fatal::new(
        FatalKind::PathBlocked,
        format!("vein path to {} = {coordinate} blocked at {here}", entry.axis),
    )
}

impl StepMachine for VeinExplorer {
    type Phase = VeinPhase;

    fn phase(&self) -> VeinPhase {
        self.phase
    }

    fn enter(&mut self, phase: VeinPhase) {
        self.phase = phase;
    }

    fn step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<VeinPhase>> {
        match self.phase {
            VeinPhase::Probe => self.probe_step(rig),
            VeinPhase::Enter => self.enter_step(rig),
            VeinPhase::Backtrack => self.backtrack_step(rig),
            VeinPhase::Withdraw => self.withdraw_step(rig),
            VeinPhase::Stalled => Ok(Transition::Retry),
            VeinPhase::Rejoin => self.rejoin_step(rig),
        }
    }
}

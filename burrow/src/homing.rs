//! Return-to-base round trip: unload, refuel, and come back to the same pose.
//!
//! The sequencer is embedded in a task's record. The task arms it with the
//! phase it wants to resume in, delegates steps to it while it runs, and
//! takes the resume phase back once it finishes.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::transition::{Fatal, FatalKind, Phase, Transition};
use crate::core::types::{Axis, Pose};
use crate::excavator::Travel;
use crate::io::actuator::Agent;
use crate::io::store::StateStore;
use crate::machine::{Rig, StepMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomingPhase {
    #[default]
    Save,
    Ascend,
    InboundFirst,
    InboundSecond,
    Descend,
    Offload,
    Refuel,
    Climb,
    OutboundFirst,
    OutboundSecond,
    Restore,
    Resume,
}

impl Phase for HomingPhase {
    const ORDER: &'static [Self] = &[
        HomingPhase::Save,
        HomingPhase::Ascend,
        HomingPhase::InboundFirst,
        HomingPhase::InboundSecond,
        HomingPhase::Descend,
        HomingPhase::Offload,
        HomingPhase::Refuel,
        HomingPhase::Climb,
        HomingPhase::OutboundFirst,
        HomingPhase::OutboundSecond,
        HomingPhase::Restore,
        HomingPhase::Resume,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Phase"))]
pub struct HomingSequencer<P> {
    #[serde(default)]
    pub phase: HomingPhase,
    /// Task phase to return to; `Some` while armed.
    #[serde(default)]
    pub resume: Option<P>,
    /// Pose captured on departure.
    #[serde(default)]
    pub saved: Option<Pose>,
    /// Stop at the base instead of returning to `saved`.
    #[serde(default)]
    pub one_way: bool,
}

impl<P> Default for HomingSequencer<P> {
    fn default() -> Self {
        Self {
            phase: HomingPhase::Save,
            resume: None,
            saved: None,
            one_way: false,
        }
    }
}

impl<P: Phase> HomingSequencer<P> {
    /// Arm for a trip that resumes the task in `resume`. No-op if already armed.
    pub fn arm(&mut self, resume: P) {
        self.arm_with(resume, false);
    }

    /// Like [`arm`](Self::arm), but the trip ends at the base after refuelling.
    pub fn arm_final(&mut self, resume: P) {
        self.arm_with(resume, true);
    }

    fn arm_with(&mut self, resume: P, one_way: bool) {
        if self.resume.is_some() {
            return;
        }
        info!(?resume, one_way, "homing armed");
        *self = Self {
            phase: HomingPhase::Save,
            resume: Some(resume),
            saved: None,
            one_way,
        };
    }

    pub fn is_armed(&self) -> bool {
        self.resume.is_some()
    }

    /// Disarm and hand back the resume phase.
    pub fn finish(&mut self) -> Option<P> {
        std::mem::take(self).resume
    }

    fn travel<A: Agent, S: StateStore<Pose>>(
        rig: &mut Rig<'_, A, S>,
        axis: Axis,
        target: i64,
    ) -> Result<Transition<HomingPhase>> {
        Ok(match rig.travel_axis(axis, target)? {
            Travel::Reached => Transition::Advance,
            Travel::Blocked => Transition::Fatal(Fatal::new(
                FatalKind::PathBlocked,
                format!("cannot reach {axis} = {target} from {}", rig.position()),
            )),
            Travel::StorageFull => Transition::Fatal(Fatal::new(
                FatalKind::StorageJammed,
                format!("no room to dig toward {axis} = {target} from {}", rig.position()),
            )),
        })
    }

    fn offload<A: Agent, S: StateStore<Pose>>(
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<HomingPhase>> {
        let base = &rig.config().base;
        let pending = rig
            .body()
            .slots()
            .into_iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_empty())
            .filter(|(_, slot)| {
                slot.material
                    .as_ref()
                    .is_some_and(|material| !base.keep.contains(material))
            })
            .collect::<Vec<_>>();
        if pending.is_empty() {
            return Ok(Transition::Advance);
        }
        let Some(face) = rig.face(base.drop_direction)? else {
            return Ok(Transition::Fatal(Fatal::new(
                FatalKind::PathBlocked,
                "cannot face the drop container",
            )));
        };
        let mut transferred = 0;
        for (index, slot) in &pending {
            transferred += rig.body().deposit(*index, face, slot.count);
        }
        if transferred == 0 {
            let left = pending.iter().map(|(_, slot)| slot.count).sum::<u32>();
            warn!(left, "drop container accepted nothing");
            return Ok(Transition::Fatal(Fatal::new(
                FatalKind::ReceptacleFull,
                format!("{left} items left in {} slots", pending.len()),
            )));
        }
        debug!(transferred, "offloaded");
        Ok(Transition::Retry)
    }

    fn refuel<A: Agent, S: StateStore<Pose>>(
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<HomingPhase>> {
        let config = rig.config();
        let Some(level) = rig.body().fuel_level() else {
            return Ok(Transition::Advance);
        };
        if level >= config.fuel.refuel_target {
            return Ok(Transition::Advance);
        }
        let Some(face) = rig.face(config.base.fuel_direction)? else {
            return Ok(Transition::Fatal(Fatal::new(
                FatalKind::PathBlocked,
                "cannot face the fuel container",
            )));
        };
        let gained = rig.body().refuel(face);
        if gained == 0 {
            return Ok(Transition::Fatal(Fatal::new(
                FatalKind::NoFuel,
                format!("fuel at {level}, target {}", config.fuel.refuel_target),
            )));
        }
        debug!(level = level + gained, gained, "refuelled");
        Ok(Transition::Retry)
    }
}

impl<P: Phase> StepMachine for HomingSequencer<P> {
    type Phase = HomingPhase;

    fn phase(&self) -> HomingPhase {
        self.phase
    }

    fn enter(&mut self, phase: HomingPhase) {
        self.phase = phase;
    }

    fn step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<HomingPhase>> {
        let base = rig.config().base.clone();
        let Some(second_axis) = base.first_axis.other_horizontal() else {
            return Ok(Transition::Fatal(Fatal::new(
                FatalKind::PathBlocked,
                "base.first_axis is not horizontal",
            )));
        };
        // Phases past Save fall back to the current pose if the save was lost.
        let saved = self.saved.unwrap_or_else(|| rig.pose());
        match self.phase {
            HomingPhase::Save => {
                if self.saved.is_none() {
                    self.saved = Some(rig.pose());
                    debug!(pose = ?rig.pose(), "departure pose saved");
                }
                Ok(Transition::Advance)
            }
            HomingPhase::Ascend | HomingPhase::Climb => Self::travel(rig, Axis::Y, base.travel_y),
            HomingPhase::InboundFirst => {
                Self::travel(rig, base.first_axis, base.position.get(base.first_axis))
            }
            HomingPhase::InboundSecond => {
                Self::travel(rig, second_axis, base.position.get(second_axis))
            }
            HomingPhase::Descend => Self::travel(rig, Axis::Y, base.position.y),
            HomingPhase::Offload => Self::offload(rig),
            HomingPhase::Refuel => match Self::refuel(rig)? {
                Transition::Advance if self.one_way => Ok(Transition::Jump(HomingPhase::Resume)),
                other => Ok(other),
            },
            HomingPhase::OutboundFirst => {
                Self::travel(rig, second_axis, saved.position.get(second_axis))
            }
            HomingPhase::OutboundSecond => {
                Self::travel(rig, base.first_axis, saved.position.get(base.first_axis))
            }
            HomingPhase::Restore => {
                let moved = Self::travel(rig, Axis::Y, saved.position.y)?;
                if moved != Transition::Advance {
                    return Ok(moved);
                }
                if !rig.turn_to(saved.heading)? {
                    return Ok(Transition::Retry);
                }
                Ok(Transition::Advance)
            }
            HomingPhase::Resume => {
                info!(position = %rig.position(), "homing complete");
                Ok(Transition::Advance)
            }
        }
    }
}

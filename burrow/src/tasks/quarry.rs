//! Strip-mine a rectangular volume layer by layer.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::transition::{Phase, Progress, Transition};
use crate::core::types::{Axis, Pose, Position};
use crate::excavator::Travel;
use crate::homing::HomingSequencer;
use crate::io::actuator::Agent;
use crate::io::store::{Persisted, StateStore};
use crate::machine::{Rig, StepMachine, apply};
use crate::tasks::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarryPhase {
    #[default]
    Dig,
    Finish,
    Homing,
    Complete,
}

impl Phase for QuarryPhase {
    const ORDER: &'static [Self] = &[
        QuarryPhase::Dig,
        QuarryPhase::Finish,
        QuarryPhase::Homing,
        QuarryPhase::Complete,
    ];
}

/// Clears `width` (+x) by `length` (+z) cells over `depth` layers going down
/// from `origin`, in serpentine order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quarry {
    #[serde(default)]
    pub phase: QuarryPhase,
    pub origin: Position,
    pub width: u32,
    pub length: u32,
    pub depth: u32,
    /// Cells cleared so far, in visiting order.
    #[serde(default)]
    pub mined: u64,
    #[serde(default)]
    pub homing: HomingSequencer<QuarryPhase>,
}

impl Persisted for Quarry {
    const KIND: &'static str = "quarry";
    const VERSION: u32 = 1;
}

impl Quarry {
    pub fn new(origin: Position, width: u32, length: u32, depth: u32) -> Result<Self> {
        if width == 0 || length == 0 || depth == 0 {
            bail!("quarry dimensions must be positive (got {width}x{length}x{depth})");
        }
        Ok(Self {
            phase: QuarryPhase::Dig,
            origin,
            width,
            length,
            depth,
            mined: 0,
            homing: HomingSequencer::default(),
        })
    }

    pub fn total(&self) -> u64 {
        u64::from(self.width) * u64::from(self.length) * u64::from(self.depth)
    }

    /// The `index`-th cell in visiting order.
    ///
    /// Rows snake back and forth within a layer and each layer walks its rows
    /// in the opposite order of the one above, so consecutive cells are
    /// always neighbours.
    pub fn cell(&self, index: u64) -> Position {
        let width = u64::from(self.width);
        let length = u64::from(self.length);
        let per_layer = width * length;
        let layer = index / per_layer;
        let within = index % per_layer;
        let row = within / width;
        let column = within % width;
        let z = if layer % 2 == 0 { row } else { length - 1 - row };
        let x = if (layer * length + row) % 2 == 0 {
            column
        } else {
            width - 1 - column
        };
        Position::new(
            self.origin.x + x as i64,
            self.origin.y - layer as i64,
            self.origin.z + z as i64,
        )
    }

    fn go_home(&mut self, resume: QuarryPhase) -> Transition<QuarryPhase> {
        self.homing.arm(resume);
        Transition::Jump(QuarryPhase::Homing)
    }

    fn dig<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<QuarryPhase>> {
        if self.mined >= self.total() {
            info!(cells = self.mined, "quarry volume cleared");
            return Ok(Transition::Advance);
        }
        let target = self.cell(self.mined);
        let here = rig.position();
        if here == target {
            self.mined += 1;
            return Ok(Transition::Retry);
        }
        if rig.fuel_low() {
            return Ok(self.go_home(QuarryPhase::Dig));
        }
        let Some(axis) = [Axis::X, Axis::Z, Axis::Y]
            .into_iter()
            .find(|axis| here.get(*axis) != target.get(*axis))
        else {
            return Ok(Transition::Retry);
        };
        Ok(match rig.travel_axis(axis, target.get(axis))? {
            Travel::Reached => Transition::Retry,
            Travel::StorageFull => self.go_home(QuarryPhase::Dig),
            Travel::Blocked => {
                warn!(%target, mined = self.mined, "quarry blocked, finishing early");
                Transition::Jump(QuarryPhase::Finish)
            }
        })
    }

    fn home<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<QuarryPhase>> {
        let transition = self.homing.step(rig)?;
        Ok(match apply(&mut self.homing, transition) {
            Progress::Running(_) => Transition::Retry,
            Progress::Finished => {
                Transition::Jump(self.homing.finish().unwrap_or(QuarryPhase::Dig))
            }
            Progress::Halted(fatal) => Transition::Fatal(fatal),
        })
    }
}

impl StepMachine for Quarry {
    type Phase = QuarryPhase;

    fn phase(&self) -> QuarryPhase {
        self.phase
    }

    fn enter(&mut self, phase: QuarryPhase) {
        self.phase = phase;
    }

    fn step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<QuarryPhase>> {
        match self.phase {
            QuarryPhase::Dig => self.dig(rig),
            QuarryPhase::Finish => {
                self.homing.arm_final(QuarryPhase::Complete);
                Ok(Transition::Jump(QuarryPhase::Homing))
            }
            QuarryPhase::Homing => self.home(rig),
            QuarryPhase::Complete => Ok(Transition::Advance),
        }
    }
}

impl Task for Quarry {
    fn progress(&self) -> String {
        format!("{}/{} cells", self.mined.min(self.total()), self.total())
    }

    fn check(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.width == 0 || self.length == 0 || self.depth == 0 {
            errors.push("quarry dimensions must be positive".to_string());
        }
        if self.mined > self.total() {
            errors.push(format!(
                "mined {} exceeds the {} cells in the volume",
                self.mined,
                self.total()
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::materials::MaterialClassification;
    use crate::io::config::AgentConfig;
    use crate::machine::TaskRecord;
    use crate::test_support::{Container, GridWorld, MemoryStore};
    use crate::tracker::PositionTracker;

    #[test]
    fn serpentine_cells_are_unit_neighbours() {
        let quarry = Quarry::new(Position::new(5, 10, -2), 3, 4, 3).expect("quarry");
        let cells = (0..quarry.total())
            .map(|index| quarry.cell(index))
            .collect::<Vec<_>>();
        assert_eq!(cells[0], Position::new(5, 10, -2));
        for pair in cells.windows(2) {
            assert_eq!(pair[0].manhattan(&pair[1]), 1, "{} -> {}", pair[0], pair[1]);
        }
        let unique = cells.iter().collect::<std::collections::BTreeSet<_>>();
        assert_eq!(unique.len(), cells.len());
        assert!(cells.iter().all(|cell| cell.y <= 10 && cell.y > 7));
    }

    #[test]
    fn rejects_empty_volume() {
        assert!(Quarry::new(Position::ORIGIN, 0, 3, 3).is_err());
    }

    #[test]
    fn dig_reconciles_a_cell_reached_before_the_last_save() {
        let mut quarry = Quarry::new(Position::ORIGIN, 2, 1, 1).expect("quarry");
        quarry.mined = 1;
        let mut world = GridWorld::open(Pose::default()).relocated(Pose::new(
            Position::new(1, 0, 0),
            crate::core::types::Heading::East,
        ));
        let mut tracker = PositionTracker::with_pose(world.pose(), MemoryStore::new());
        let materials = MaterialClassification::default();
        let config = AgentConfig::default();

        let mut rig = Rig::new(&mut world, &mut tracker, &materials, &config);
        assert_eq!(quarry.step(&mut rig).expect("step"), Transition::Retry);
        assert_eq!(quarry.mined, 2);
        assert!(world.calls().is_empty());
    }

    #[test]
    fn low_fuel_goes_home_and_resumes_digging() {
        let mut world = GridWorld::open(Pose::default());
        world.fill(
            Position::new(0, -3, 1),
            Position::new(2, 0, 3),
            "minecraft:stone",
        );
        world.place_container(Position::new(0, 1, 0), Container::drop_box(1_000));
        world.place_container(Position::new(0, -1, 0), Container::fuel_box(10_000));
        world.set_fuel(Some(30));
        let mut config = AgentConfig::default();
        config.fuel.reserve = 8;
        config.fuel.refuel_target = 400;
        let materials = MaterialClassification::default();
        let mut tracker = PositionTracker::with_pose(Pose::default(), MemoryStore::new());
        let mut quarry = Quarry::new(Position::new(0, 0, 1), 3, 3, 4).expect("quarry");
        let mut went_home = false;

        for _ in 0..5_000 {
            let mut rig = Rig::new(&mut world, &mut tracker, &materials, &config);
            let transition = quarry.step(&mut rig).expect("step");
            went_home |= quarry.phase == QuarryPhase::Homing;
            match apply(&mut quarry, transition) {
                Progress::Running(_) => {}
                Progress::Finished => break,
                Progress::Halted(fatal) => panic!("halted: {fatal}"),
            }
        }

        assert!(went_home);
        assert_eq!(quarry.mined, quarry.total());
        assert_eq!(tracker.position(), Position::ORIGIN);
        assert_eq!(world.spilled(), 0);
        for index in 0..quarry.total() {
            assert_eq!(world.block(quarry.cell(index)), None);
        }
    }

    #[test]
    fn record_round_trips_through_the_envelope() {
        let mut quarry = Quarry::new(Position::new(1, 2, 3), 4, 5, 6).expect("quarry");
        quarry.mined = 17;
        quarry.homing.arm(QuarryPhase::Dig);
        let record = TaskRecord::new(quarry);
        let raw = crate::io::store::encode(&record).expect("encode");
        assert!(raw.starts_with(r#"{"kind":"quarry","version":1,"#));
        let back: TaskRecord<Quarry> = crate::io::store::decode(&raw).expect("decode");
        assert_eq!(back, record);
    }
}

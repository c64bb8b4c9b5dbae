//! The step-machine contract shared by every task, and the context a step runs in.
//!
//! A machine owns all of its progress in serializable fields. Each call to
//! [`StepMachine::step`] performs one bounded unit of work against a [`Rig`]
//! and reports a [`Transition`]; the driver applies it with [`apply`] and
//! persists the enclosing [`TaskRecord`] before the next call.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::materials::MaterialClassification;
use crate::core::transition::{Fatal, Phase, Progress, Transition, next_phase};
use crate::core::types::{Axis, Direction, Face, Heading, Pose, Position};
use crate::excavator::{Cell, Excavation, Excavator, Travel, Tunnel};
use crate::io::actuator::Agent;
use crate::io::config::AgentConfig;
use crate::io::store::{Persisted, StateStore};
use crate::tracker::PositionTracker;

pub trait StepMachine {
    type Phase: Phase;

    fn phase(&self) -> Self::Phase;

    /// Set the current phase. Called by [`apply`] only.
    fn enter(&mut self, phase: Self::Phase);

    fn step<A: Agent, S: StateStore<Pose>>(
        &mut self,
        rig: &mut Rig<'_, A, S>,
    ) -> Result<Transition<Self::Phase>>;
}

/// Apply `transition` to `machine`, entering the next phase if any.
///
/// A fatal leaves the machine in the phase that raised it.
pub fn apply<M: StepMachine>(machine: &mut M, transition: Transition<M::Phase>) -> Progress<M::Phase> {
    let progress = next_phase(machine.phase(), transition);
    if let Progress::Running(next) = &progress {
        machine.enter(*next);
    }
    progress
}

/// Everything a step may touch: the body, the tracker and the read-only run inputs.
pub struct Rig<'a, A, S> {
    body: &'a mut A,
    tracker: &'a mut PositionTracker<S>,
    excavator: Excavator<'a>,
    config: &'a AgentConfig,
}

impl<'a, A: Agent, S: StateStore<Pose>> Rig<'a, A, S> {
    pub fn new(
        body: &'a mut A,
        tracker: &'a mut PositionTracker<S>,
        materials: &'a MaterialClassification,
        config: &'a AgentConfig,
    ) -> Self {
        Self {
            body,
            tracker,
            excavator: Excavator::new(materials, config.excavation.debris_retries),
            config,
        }
    }

    pub fn pose(&self) -> Pose {
        self.tracker.pose()
    }

    pub fn position(&self) -> Position {
        self.tracker.position()
    }

    pub fn config(&self) -> &'a AgentConfig {
        self.config
    }

    pub fn materials(&self) -> &'a MaterialClassification {
        self.excavator.materials()
    }

    pub fn body(&mut self) -> &mut A {
        self.body
    }

    pub fn face(&mut self, direction: Direction) -> Result<Option<Face>> {
        self.tracker.face(self.body, direction)
    }

    pub fn turn_to(&mut self, heading: Heading) -> Result<bool> {
        self.tracker.turn_to(self.body, heading)
    }

    pub fn move_to_axis(&mut self, axis: Axis, coordinate: i64) -> Result<i64> {
        self.tracker.move_to_axis(self.body, axis, coordinate)
    }

    pub fn probe(&mut self, direction: Direction) -> Result<Cell> {
        self.excavator.probe(self.body, self.tracker, direction)
    }

    pub fn has_room(&mut self, material: &str) -> bool {
        self.excavator.has_room(self.body, material)
    }

    pub fn try_remove(&mut self, direction: Direction) -> Result<Excavation> {
        self.excavator.try_remove(self.body, self.tracker, direction)
    }

    pub fn tunnel(&mut self, direction: Direction) -> Result<Tunnel> {
        self.excavator.tunnel(self.body, self.tracker, direction)
    }

    pub fn travel_axis(&mut self, axis: Axis, target: i64) -> Result<Travel> {
        self.excavator
            .travel_axis(self.body, self.tracker, axis, target)
    }

    /// Moves needed to get from here to the base via the travel altitude.
    pub fn distance_home(&self) -> u64 {
        let here = self.position();
        let base = &self.config.base;
        here.y.abs_diff(base.travel_y)
            + here.x.abs_diff(base.position.x)
            + here.z.abs_diff(base.position.z)
            + base.travel_y.abs_diff(base.position.y)
    }

    /// True when remaining fuel no longer covers the trip home plus the reserve.
    pub fn fuel_low(&mut self) -> bool {
        match self.body.fuel_level() {
            None => false,
            Some(level) => {
                u64::from(level) < self.distance_home() + u64::from(self.config.fuel.reserve)
            }
        }
    }
}

/// Persisted form of a running task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord<M> {
    pub task: M,
    /// Steps executed over the task's lifetime, across restarts.
    #[serde(default)]
    pub steps: u64,
    /// Set while a fatal awaits operator acknowledgement.
    #[serde(default)]
    pub halted: Option<Fatal>,
    #[serde(default)]
    pub finished: bool,
}

impl<M> TaskRecord<M> {
    pub fn new(task: M) -> Self {
        Self {
            task,
            steps: 0,
            halted: None,
            finished: false,
        }
    }
}

impl<M: Persisted> Persisted for TaskRecord<M> {
    const KIND: &'static str = M::KIND;
    const VERSION: u32 = M::VERSION;

    fn upgrade(from: u32, state: Value) -> Result<Value> {
        let Value::Object(mut record) = state else {
            return Ok(state);
        };
        if let Some(task) = record.remove("task") {
            record.insert("task".to_string(), M::upgrade(from, task)?);
        }
        Ok(Value::Object(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transition::FatalKind;
    use crate::io::store::{decode, encode};
    use crate::test_support::{GridWorld, MemoryStore};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    enum Leg {
        Out,
        Back,
    }

    impl Phase for Leg {
        const ORDER: &'static [Self] = &[Leg::Out, Leg::Back];
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Shuttle {
        phase: Leg,
        #[serde(default)]
        trips: u32,
    }

    impl Persisted for Shuttle {
        const KIND: &'static str = "shuttle";
        const VERSION: u32 = 2;

        fn upgrade(from: u32, mut state: Value) -> Result<Value> {
            if from < 2 {
                if let Some(legs) = state.get("legs").cloned() {
                    state["trips"] = legs;
                }
            }
            Ok(state)
        }
    }

    impl StepMachine for Shuttle {
        type Phase = Leg;

        fn phase(&self) -> Leg {
            self.phase
        }

        fn enter(&mut self, phase: Leg) {
            self.phase = phase;
        }

        fn step<A: Agent, S: StateStore<Pose>>(
            &mut self,
            rig: &mut Rig<'_, A, S>,
        ) -> Result<Transition<Leg>> {
            let target = match self.phase {
                Leg::Out => 2,
                Leg::Back => 0,
            };
            match rig.travel_axis(Axis::X, target)? {
                Travel::Reached => {
                    self.trips += 1;
                    Ok(Transition::Advance)
                }
                _ => Ok(Transition::Fatal(Fatal::new(FatalKind::PathBlocked, "x axis"))),
            }
        }
    }

    #[test]
    fn apply_enters_next_phase_and_keeps_phase_on_fatal() {
        let mut shuttle = Shuttle {
            phase: Leg::Out,
            trips: 0,
        };
        assert_eq!(
            apply(&mut shuttle, Transition::Advance),
            Progress::Running(Leg::Back)
        );
        assert_eq!(shuttle.phase, Leg::Back);

        let fatal = Fatal::new(FatalKind::NoFuel, "dry");
        assert_eq!(
            apply(&mut shuttle, Transition::Fatal(fatal.clone())),
            Progress::Halted(fatal)
        );
        assert_eq!(shuttle.phase, Leg::Back);
        assert_eq!(apply(&mut shuttle, Transition::Advance), Progress::Finished);
    }

    #[test]
    fn machine_steps_against_a_rig() {
        let config = AgentConfig::default();
        let materials = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        let mut tracker = PositionTracker::with_pose(Pose::default(), MemoryStore::new());
        let mut shuttle = Shuttle {
            phase: Leg::Out,
            trips: 0,
        };

        let mut rig = Rig::new(&mut world, &mut tracker, &materials, &config);
        let first = shuttle.step(&mut rig).expect("out");
        assert_eq!(rig.position(), Position::new(2, 0, 0));
        assert_eq!(apply(&mut shuttle, first), Progress::Running(Leg::Back));
        let second = shuttle.step(&mut rig).expect("back");
        assert_eq!(apply(&mut shuttle, second), Progress::Finished);
        assert_eq!(rig.position(), Position::ORIGIN);
        assert_eq!(shuttle.trips, 2);
    }

    #[test]
    fn fuel_low_accounts_for_trip_home_and_reserve() {
        let mut config = AgentConfig::default();
        config.base.travel_y = 2;
        config.fuel.reserve = 5;
        let materials = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        let mut tracker = PositionTracker::with_pose(
            Pose::new(Position::new(3, -1, 4), Heading::North),
            MemoryStore::new(),
        );
        let mut rig = Rig::new(&mut world, &mut tracker, &materials, &config);
        assert_eq!(rig.distance_home(), 3 + 3 + 4 + 2);
        assert!(!rig.fuel_low());

        rig.body().set_fuel(Some(16));
        assert!(rig.fuel_low());
        rig.body().set_fuel(Some(17));
        assert!(!rig.fuel_low());
    }

    #[test]
    fn task_record_envelope_upgrades_inner_task() {
        let raw = r#"{"kind":"shuttle","version":1,"state":{"task":{"phase":"Back","legs":3},"steps":9}}"#;
        let record: TaskRecord<Shuttle> = decode(raw).expect("decode");
        assert_eq!(record.task.trips, 3);
        assert_eq!(record.steps, 9);
        assert_eq!(record.halted, None);

        let encoded = encode(&record).expect("encode");
        assert!(encoded.starts_with(r#"{"kind":"shuttle","version":2,"#));
    }
}

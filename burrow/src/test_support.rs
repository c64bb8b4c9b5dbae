//! Deterministic in-memory collaborators for tests and the simulator.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use anyhow::Result;

use crate::core::capacity::Slot;
use crate::core::transition::Fatal;
use crate::core::types::{Direction, Face, Pose, Position};
use crate::io::actuator::{Actuator, Storage};
use crate::io::operator::{Acknowledgement, Operator};
use crate::io::store::{Persisted, StateStore, decode, encode};

pub const SLOT_COUNT: usize = 16;
pub const STACK_SIZE: u32 = 64;
pub const CHEST: &str = "minecraft:chest";
pub const GRAVEL: &str = "minecraft:gravel";

/// One primitive issued against a [`GridWorld`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Forward,
    Back,
    Up,
    Down,
    TurnLeft,
    TurnRight,
    Inspect(Face),
    Dig(Face),
    Slots,
    Deposit { slot: usize, face: Face, count: u32 },
    FuelLevel,
    Refuel(Face),
}

/// A container cell at the base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub capacity: u32,
    pub items: BTreeMap<String, u32>,
    /// Fuel units handed out by `refuel`.
    pub fuel: u32,
}

impl Container {
    pub fn drop_box(capacity: u32) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn fuel_box(fuel: u32) -> Self {
        Self {
            fuel,
            ..Self::default()
        }
    }

    pub fn stored(&self) -> u32 {
        self.items.values().sum()
    }
}

/// Sparse block grid with a single agent in it.
///
/// Absent cells are air. Every successful move costs one fuel unit when
/// fuel is limited.
#[derive(Debug, Clone)]
pub struct GridWorld {
    cells: BTreeMap<Position, String>,
    unbreakable: BTreeSet<String>,
    drops: BTreeMap<String, String>,
    debris: BTreeMap<Position, u32>,
    containers: BTreeMap<Position, Container>,
    pose: Pose,
    slots: Vec<Slot>,
    fuel: Option<u32>,
    fuel_per_pull: u32,
    calls: Vec<Call>,
    mined: Vec<(Position, String)>,
    spilled: u32,
}

impl GridWorld {
    /// Empty world, unlimited fuel, empty inventory.
    pub fn open(pose: Pose) -> Self {
        Self {
            cells: BTreeMap::new(),
            unbreakable: BTreeSet::from(["minecraft:bedrock".to_string()]),
            drops: BTreeMap::new(),
            debris: BTreeMap::new(),
            containers: BTreeMap::new(),
            pose,
            slots: vec![Slot::empty(STACK_SIZE); SLOT_COUNT],
            fuel: None,
            fuel_per_pull: 500,
            calls: Vec::new(),
            mined: Vec::new(),
            spilled: 0,
        }
    }

    /// Move the agent without issuing any primitive.
    pub fn relocated(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    pub fn set_block(&mut self, position: Position, material: &str) {
        self.cells.insert(position, material.to_string());
    }

    /// Fill the inclusive box between `a` and `b`.
    pub fn fill(&mut self, a: Position, b: Position, material: &str) {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for z in a.z.min(b.z)..=a.z.max(b.z) {
                    self.set_block(Position::new(x, y, z), material);
                }
            }
        }
    }

    pub fn clear(&mut self, position: Position) {
        self.cells.remove(&position);
    }

    pub fn block(&self, position: Position) -> Option<&str> {
        self.cells.get(&position).map(String::as_str)
    }

    pub fn set_unbreakable(&mut self, material: &str) {
        self.unbreakable.insert(material.to_string());
    }

    /// Digging `material` yields `item` instead of itself.
    pub fn set_drop(&mut self, material: &str, item: &str) {
        self.drops.insert(material.to_string(), item.to_string());
    }

    /// The cell at `position` refills with gravel `times` more times.
    pub fn set_debris(&mut self, position: Position, times: u32) {
        self.debris.insert(position, times);
    }

    pub fn place_container(&mut self, position: Position, container: Container) {
        self.cells.insert(position, CHEST.to_string());
        self.containers.insert(position, container);
    }

    pub fn container(&self, position: Position) -> Option<&Container> {
        self.containers.get(&position)
    }

    pub fn set_fuel(&mut self, fuel: Option<u32>) {
        self.fuel = fuel;
    }

    pub fn set_fuel_per_pull(&mut self, units: u32) {
        self.fuel_per_pull = units;
    }

    pub fn set_slot(&mut self, index: usize, slot: Slot) {
        if let Some(existing) = self.slots.get_mut(index) {
            *existing = slot;
        }
    }

    /// Fill every slot with a full stack of `material`.
    pub fn fill_inventory(&mut self, material: &str) {
        for slot in &mut self.slots {
            *slot = Slot::holding(material, STACK_SIZE, 0);
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn fuel(&self) -> Option<u32> {
        self.fuel
    }

    pub fn inventory(&self) -> &[Slot] {
        &self.slots
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn mined(&self) -> &[(Position, String)] {
        &self.mined
    }

    pub fn spilled(&self) -> u32 {
        self.spilled
    }

    pub fn cells(&self) -> impl Iterator<Item = (&Position, &String)> {
        self.cells.iter()
    }

    fn face_target(&self, face: Face) -> Position {
        let direction = match face {
            Face::Front => Direction::from(self.pose.heading),
            Face::Up => Direction::Up,
            Face::Down => Direction::Down,
        };
        self.pose.position.step(direction)
    }

    fn try_move(&mut self, direction: Direction) -> bool {
        let target = self.pose.position.step(direction);
        if self.cells.contains_key(&target) || self.fuel == Some(0) {
            return false;
        }
        if let Some(fuel) = self.fuel.as_mut() {
            *fuel -= 1;
        }
        self.pose.position = target;
        true
    }

    fn collect(&mut self, item: String) {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.material.as_deref() == Some(item.as_str()) && slot.space > 0)
        {
            slot.count += 1;
            slot.space -= 1;
            return;
        }
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.is_empty()) {
            *slot = Slot::holding(&item, 1, STACK_SIZE - 1);
            return;
        }
        self.spilled += 1;
    }
}

impl Actuator for GridWorld {
    fn forward(&mut self) -> bool {
        self.calls.push(Call::Forward);
        self.try_move(Direction::from(self.pose.heading))
    }

    fn back(&mut self) -> bool {
        self.calls.push(Call::Back);
        self.try_move(Direction::from(self.pose.heading.opposite()))
    }

    fn up(&mut self) -> bool {
        self.calls.push(Call::Up);
        self.try_move(Direction::Up)
    }

    fn down(&mut self) -> bool {
        self.calls.push(Call::Down);
        self.try_move(Direction::Down)
    }

    fn turn_left(&mut self) -> bool {
        self.calls.push(Call::TurnLeft);
        self.pose.heading = self.pose.heading.left();
        true
    }

    fn turn_right(&mut self) -> bool {
        self.calls.push(Call::TurnRight);
        self.pose.heading = self.pose.heading.right();
        true
    }

    fn inspect(&mut self, face: Face) -> Option<String> {
        self.calls.push(Call::Inspect(face));
        self.cells.get(&self.face_target(face)).cloned()
    }

    fn dig(&mut self, face: Face) -> bool {
        self.calls.push(Call::Dig(face));
        let target = self.face_target(face);
        let Some(material) = self.cells.get(&target).cloned() else {
            return false;
        };
        if self.unbreakable.contains(&material) || self.containers.contains_key(&target) {
            return false;
        }
        self.cells.remove(&target);
        let item = self.drops.get(&material).cloned().unwrap_or_else(|| material.clone());
        self.mined.push((target, material));
        self.collect(item);
        if let Some(remaining) = self.debris.get_mut(&target).filter(|left| **left > 0) {
            *remaining -= 1;
            self.cells.insert(target, GRAVEL.to_string());
        }
        true
    }
}

impl Storage for GridWorld {
    fn slots(&mut self) -> Vec<Slot> {
        self.calls.push(Call::Slots);
        self.slots.clone()
    }

    fn deposit(&mut self, slot: usize, face: Face, count: u32) -> u32 {
        self.calls.push(Call::Deposit { slot, face, count });
        let target = self.face_target(face);
        let (Some(container), Some(source)) =
            (self.containers.get_mut(&target), self.slots.get_mut(slot))
        else {
            return 0;
        };
        let Some(material) = source.material.clone() else {
            return 0;
        };
        let room = container.capacity.saturating_sub(container.stored());
        let moved = count.min(source.count).min(room);
        if moved == 0 {
            return 0;
        }
        *container.items.entry(material).or_default() += moved;
        source.count -= moved;
        source.space += moved;
        if source.count == 0 {
            *source = Slot::empty(STACK_SIZE);
        }
        moved
    }

    fn fuel_level(&mut self) -> Option<u32> {
        self.calls.push(Call::FuelLevel);
        self.fuel
    }

    fn refuel(&mut self, face: Face) -> u32 {
        self.calls.push(Call::Refuel(face));
        let target = self.face_target(face);
        let (Some(level), Some(container)) = (self.fuel.as_mut(), self.containers.get_mut(&target))
        else {
            return 0;
        };
        let gained = container.fuel.min(self.fuel_per_pull);
        container.fuel -= gained;
        *level += gained;
        gained
    }
}

/// In-memory [`StateStore`] that round-trips through the on-disk encoding.
#[derive(Debug, Clone)]
pub struct MemoryStore<T> {
    current: Option<String>,
    history: Vec<T>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            current: None,
            history: Vec::new(),
        }
    }

    pub fn writes(&self) -> usize {
        self.history.len()
    }

    /// Every saved value, oldest first.
    pub fn history(&self) -> &[T] {
        &self.history
    }

    pub fn raw(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Persisted + Clone> MemoryStore<T> {
    pub fn seeded(value: &T) -> Result<Self> {
        Ok(Self {
            current: Some(encode(value)?),
            history: Vec::new(),
        })
    }
}

impl<T: Persisted + Clone> StateStore<T> for MemoryStore<T> {
    fn load(&mut self) -> Result<Option<T>> {
        self.current.as_deref().map(decode).transpose()
    }

    fn save(&mut self, value: &T) -> Result<()> {
        self.current = Some(encode(value)?);
        self.history.push(value.clone());
        Ok(())
    }
}

/// Operator that answers from a fixed script and records what it saw.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<Acknowledgement>,
    seen: Vec<Fatal>,
}

impl ScriptedOperator {
    pub fn new(answers: impl IntoIterator<Item = Acknowledgement>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            seen: Vec::new(),
        }
    }

    pub fn seen(&self) -> &[Fatal] {
        &self.seen
    }
}

impl Operator for ScriptedOperator {
    /// Aborts once the script runs out.
    fn acknowledge(&mut self, fatal: &Fatal) -> Result<Acknowledgement> {
        self.seen.push(fatal.clone());
        Ok(self.answers.pop_front().unwrap_or(Acknowledgement::Abort))
    }
}

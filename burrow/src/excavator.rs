//! Capacity-aware removal of terrain cells, and movement that digs through.

use anyhow::Result;
use tracing::{debug, instrument, warn};

use crate::core::capacity::removal_permitted;
use crate::core::materials::MaterialClassification;
use crate::core::types::{Axis, Direction, Pose};
use crate::io::actuator::Agent;
use crate::io::store::StateStore;
use crate::tracker::PositionTracker;

/// Outcome of [`Excavator::try_remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Excavation {
    /// The cell is empty now (or already was).
    Removed,
    Blocked,
    /// Storage cannot take what the cell would yield; nothing was dug.
    StorageFull,
}

/// What a probe saw in an adjacent cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Solid(String),
    /// The agent could not turn to face the cell.
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tunnel {
    Moved,
    Blocked,
    StorageFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Travel {
    Reached,
    Blocked,
    StorageFull,
}

#[derive(Debug, Clone, Copy)]
pub struct Excavator<'m> {
    materials: &'m MaterialClassification,
    debris_retries: u32,
}

impl<'m> Excavator<'m> {
    pub fn new(materials: &'m MaterialClassification, debris_retries: u32) -> Self {
        Self {
            materials,
            debris_retries,
        }
    }

    pub fn materials(&self) -> &'m MaterialClassification {
        self.materials
    }

    /// Face `direction` and report what occupies that cell.
    pub fn probe<A: Agent, S: StateStore<Pose>>(
        &self,
        body: &mut A,
        tracker: &mut PositionTracker<S>,
        direction: Direction,
    ) -> Result<Cell> {
        let Some(face) = tracker.face(body, direction)? else {
            return Ok(Cell::Unreachable);
        };
        Ok(match body.inspect(face) {
            Some(material) => Cell::Solid(material),
            None => Cell::Empty,
        })
    }

    /// Whether storage can take what digging `material` would yield.
    pub fn has_room<A: Agent>(&self, body: &mut A, material: &str) -> bool {
        removal_permitted(&body.slots(), &self.materials.equivalence_set(material))
    }

    /// Remove the cell toward `direction` if storage can take its yield.
    ///
    /// Storage is checked against the material's whole equivalence set before
    /// any dig is attempted.
    pub fn try_remove<A: Agent, S: StateStore<Pose>>(
        &self,
        body: &mut A,
        tracker: &mut PositionTracker<S>,
        direction: Direction,
    ) -> Result<Excavation> {
        let Some(face) = tracker.face(body, direction)? else {
            return Ok(Excavation::Blocked);
        };
        let Some(material) = body.inspect(face) else {
            return Ok(Excavation::Removed);
        };
        if !self.has_room(body, &material) {
            warn!(%material, %direction, "no storage room, not digging");
            return Ok(Excavation::StorageFull);
        }
        if !body.dig(face) {
            warn!(%material, %direction, position = %tracker.position(), "dig failed");
            return Ok(Excavation::Blocked);
        }
        debug!(%material, %direction, "removed");
        Ok(Excavation::Removed)
    }

    /// Move one cell toward `direction`, digging out whatever is in the way.
    ///
    /// Falling debris can refill a cleared cell; the move is retried after
    /// each clearance at most `debris_retries` times.
    pub fn tunnel<A: Agent, S: StateStore<Pose>>(
        &self,
        body: &mut A,
        tracker: &mut PositionTracker<S>,
        direction: Direction,
    ) -> Result<Tunnel> {
        let mut clearances = 0;
        loop {
            if tracker.move_relative(body, direction, 1)?.completed == 1 {
                return Ok(Tunnel::Moved);
            }
            if clearances >= self.debris_retries {
                warn!(%direction, clearances, "giving up after repeated clearances");
                return Ok(Tunnel::Blocked);
            }
            match self.try_remove(body, tracker, direction)? {
                Excavation::Removed => clearances += 1,
                Excavation::Blocked => return Ok(Tunnel::Blocked),
                Excavation::StorageFull => return Ok(Tunnel::StorageFull),
            }
        }
    }

    /// Move along `axis` to `target`, tunnelling through obstructions.
    #[instrument(skip(self, body, tracker), level = "debug")]
    pub fn travel_axis<A: Agent, S: StateStore<Pose>>(
        &self,
        body: &mut A,
        tracker: &mut PositionTracker<S>,
        axis: Axis,
        target: i64,
    ) -> Result<Travel> {
        loop {
            let reached = tracker.move_to_axis(body, axis, target)?;
            let Some(direction) = Direction::along(axis, target - reached) else {
                return Ok(Travel::Reached);
            };
            match self.tunnel(body, tracker, direction)? {
                Tunnel::Moved => {}
                Tunnel::Blocked => return Ok(Travel::Blocked),
                Tunnel::StorageFull => return Ok(Travel::StorageFull),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capacity::Slot;
    use crate::core::types::{Heading, Position};
    use crate::test_support::{Call, GRAVEL, GridWorld, MemoryStore};
    use std::collections::BTreeMap;

    fn tracker() -> PositionTracker<MemoryStore<Pose>> {
        PositionTracker::with_pose(Pose::default(), MemoryStore::new())
    }

    fn iron_table() -> MaterialClassification {
        MaterialClassification {
            equivalents: BTreeMap::from([(
                "minecraft:iron_ore".to_string(),
                vec![
                    "minecraft:iron_ore".to_string(),
                    "minecraft:raw_iron".to_string(),
                ],
            )]),
            ..MaterialClassification::default()
        }
    }

    #[test]
    fn unclassified_material_with_one_empty_slot_is_removed() {
        let table = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        world.fill_inventory("minecraft:cobblestone");
        world.set_slot(7, Slot::empty(64));
        world.set_block(Position::new(0, 0, -1), "minecraft:tuff");
        let mut tracker = tracker();

        let outcome = Excavator::new(&table, 4)
            .try_remove(&mut world, &mut tracker, Direction::North)
            .expect("remove");
        assert_eq!(outcome, Excavation::Removed);
        assert_eq!(world.block(Position::new(0, 0, -1)), None);
    }

    #[test]
    fn full_incompatible_storage_refuses_without_digging() {
        let table = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        world.fill_inventory("minecraft:cobblestone");
        world.set_block(Position::new(0, 1, 0), "minecraft:tuff");
        let mut tracker = tracker();

        let outcome = Excavator::new(&table, 4)
            .try_remove(&mut world, &mut tracker, Direction::Up)
            .expect("remove");
        assert_eq!(outcome, Excavation::StorageFull);
        assert!(!world.calls().contains(&Call::Dig(crate::core::types::Face::Up)));
        assert_eq!(world.block(Position::new(0, 1, 0)), Some("minecraft:tuff"));
    }

    #[test]
    fn every_equivalent_needs_a_partial_slot() {
        let table = iron_table();
        let mut world = GridWorld::open(Pose::default());
        world.fill_inventory("minecraft:cobblestone");
        world.set_slot(0, Slot::holding("minecraft:raw_iron", 10, 54));
        world.set_block(Position::new(0, -1, 0), "minecraft:iron_ore");
        let mut tracker = tracker();
        let excavator = Excavator::new(&table, 4);

        let outcome = excavator
            .try_remove(&mut world, &mut tracker, Direction::Down)
            .expect("first");
        assert_eq!(outcome, Excavation::StorageFull);

        world.set_slot(1, Slot::holding("minecraft:iron_ore", 3, 61));
        let outcome = excavator
            .try_remove(&mut world, &mut tracker, Direction::Down)
            .expect("second");
        assert_eq!(outcome, Excavation::Removed);
    }

    #[test]
    fn empty_cell_needs_no_dig_and_dig_failure_is_blocked() {
        let table = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        world.set_block(Position::new(1, 0, 0), "minecraft:obsidian");
        world.set_unbreakable("minecraft:obsidian");
        let mut tracker = tracker();
        let excavator = Excavator::new(&table, 4);

        let outcome = excavator
            .try_remove(&mut world, &mut tracker, Direction::West)
            .expect("west");
        assert_eq!(outcome, Excavation::Removed);
        assert!(world.calls().iter().all(|call| !matches!(call, Call::Dig(_))));

        let outcome = excavator
            .try_remove(&mut world, &mut tracker, Direction::East)
            .expect("east");
        assert_eq!(outcome, Excavation::Blocked);
        assert_eq!(tracker.heading(), Heading::East);
    }

    #[test]
    fn tunnel_clears_debris_within_retry_budget() {
        let table = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        let ahead = Position::new(0, 0, -1);
        world.set_block(ahead, "minecraft:sand");
        world.set_debris(ahead, 2);
        let mut tracker = tracker();

        let outcome = Excavator::new(&table, 3)
            .tunnel(&mut world, &mut tracker, Direction::North)
            .expect("tunnel");
        assert_eq!(outcome, Tunnel::Moved);
        assert_eq!(tracker.position(), ahead);
        assert_eq!(
            world
                .calls()
                .iter()
                .filter(|call| matches!(call, Call::Dig(_)))
                .count(),
            3
        );
    }

    #[test]
    fn tunnel_gives_up_on_endless_debris() {
        let table = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        let ahead = Position::new(0, 0, -1);
        world.set_block(ahead, GRAVEL);
        world.set_debris(ahead, 100);
        let mut tracker = tracker();

        let outcome = Excavator::new(&table, 2)
            .tunnel(&mut world, &mut tracker, Direction::North)
            .expect("tunnel");
        assert_eq!(outcome, Tunnel::Blocked);
        assert_eq!(tracker.position(), Position::ORIGIN);
    }

    #[test]
    fn travel_axis_digs_through_to_target() {
        let table = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        world.fill(
            Position::new(0, -3, 0),
            Position::new(0, -1, 0),
            "minecraft:stone",
        );
        let mut tracker = tracker();

        let outcome = Excavator::new(&table, 4)
            .travel_axis(&mut world, &mut tracker, Axis::Y, -3)
            .expect("travel");
        assert_eq!(outcome, Travel::Reached);
        assert_eq!(tracker.position(), Position::new(0, -3, 0));
        assert_eq!(world.mined().len(), 3);
    }

    #[test]
    fn travel_axis_stops_at_unbreakable_cell() {
        let table = MaterialClassification::default();
        let mut world = GridWorld::open(Pose::default());
        world.set_block(Position::new(0, -2, 0), "minecraft:bedrock");
        let mut tracker = tracker();

        let outcome = Excavator::new(&table, 4)
            .travel_axis(&mut world, &mut tracker, Axis::Y, -5)
            .expect("travel");
        assert_eq!(outcome, Travel::Blocked);
        assert_eq!(tracker.position(), Position::new(0, -1, 0));
    }
}

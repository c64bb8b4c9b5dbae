//! Dead-reckoning position tracker.
//!
//! The tracker is the only writer of the agent's pose. It changes the pose
//! strictly after the actuator confirms a move or turn, and persists it
//! after every single confirmed primitive, so a crash can lose at most the
//! primitive that was in flight, never one that was confirmed.

use anyhow::Result;
use tracing::{debug, warn};

use crate::core::types::{Axis, Direction, Face, Heading, Pose, Position};
use crate::io::actuator::Actuator;
use crate::io::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    Ok,
    Blocked,
}

/// Result of [`PositionTracker::move_relative`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    /// Unit steps confirmed by the actuator.
    pub completed: u64,
    pub status: MoveStatus,
}

#[derive(Debug)]
pub struct PositionTracker<S> {
    pose: Pose,
    store: S,
}

impl<S: StateStore<Pose>> PositionTracker<S> {
    /// Restore the pose from `store`, or start at origin facing north.
    pub fn load(mut store: S) -> Result<Self> {
        let pose = store.load()?.unwrap_or_default();
        debug!(position = %pose.position, heading = ?pose.heading, "pose restored");
        Ok(Self { pose, store })
    }

    /// Start from a known pose without touching the store.
    pub fn with_pose(pose: Pose, store: S) -> Self {
        Self { pose, store }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn position(&self) -> Position {
        self.pose.position
    }

    pub fn heading(&self) -> Heading {
        self.pose.heading
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Face `heading` using the fewest turns.
    ///
    /// Returns `false` if a turn failed; the heading then reflects the turns
    /// that did succeed.
    pub fn turn_to<A: Actuator>(&mut self, body: &mut A, heading: Heading) -> Result<bool> {
        match self.pose.heading.quarter_turns_to(heading) {
            0 => Ok(true),
            1 => self.turn_once(body, true),
            3 => self.turn_once(body, false),
            _ => Ok(self.turn_once(body, true)? && self.turn_once(body, true)?),
        }
    }

    fn turn_once<A: Actuator>(&mut self, body: &mut A, right: bool) -> Result<bool> {
        let turned = if right {
            body.turn_right()
        } else {
            body.turn_left()
        };
        if !turned {
            warn!(heading = ?self.pose.heading, right, "turn failed");
            return Ok(false);
        }
        self.pose.heading = if right {
            self.pose.heading.right()
        } else {
            self.pose.heading.left()
        };
        self.store.save(&self.pose)?;
        Ok(true)
    }

    /// Step up to `count` cells toward `direction`, stopping at the first failure.
    ///
    /// Moving opposite to the current heading uses the reverse primitive
    /// instead of turning around.
    pub fn move_relative<A: Actuator>(
        &mut self,
        body: &mut A,
        direction: Direction,
        count: u64,
    ) -> Result<MoveReport> {
        let mut completed = 0;
        while completed < count {
            if !self.step_once(body, direction)? {
                warn!(
                    position = %self.pose.position,
                    %direction,
                    completed,
                    requested = count,
                    "move blocked"
                );
                return Ok(MoveReport {
                    completed,
                    status: MoveStatus::Blocked,
                });
            }
            completed += 1;
        }
        Ok(MoveReport {
            completed,
            status: MoveStatus::Ok,
        })
    }

    fn step_once<A: Actuator>(&mut self, body: &mut A, direction: Direction) -> Result<bool> {
        let moved = match direction.heading() {
            None if direction == Direction::Up => body.up(),
            None => body.down(),
            Some(heading) if heading == self.pose.heading => body.forward(),
            Some(heading) if heading == self.pose.heading.opposite() => body.back(),
            Some(heading) => self.turn_to(body, heading)? && body.forward(),
        };
        if !moved {
            return Ok(false);
        }
        self.pose.position = self.pose.position.step(direction);
        self.store.save(&self.pose)?;
        debug!(position = %self.pose.position, %direction, "moved");
        Ok(true)
    }

    /// Move along `axis` only until it reads `coordinate`.
    ///
    /// Returns the coordinate actually reached, which falls short of the
    /// request when blocked. A zero delta issues no actuator call.
    pub fn move_to_axis<A: Actuator>(
        &mut self,
        body: &mut A,
        axis: Axis,
        coordinate: i64,
    ) -> Result<i64> {
        let delta = coordinate - self.pose.position.get(axis);
        if let Some(direction) = Direction::along(axis, delta) {
            self.move_relative(body, direction, delta.unsigned_abs())?;
        }
        Ok(self.pose.position.get(axis))
    }

    /// Orient so that `direction` is reachable through a relative face.
    ///
    /// Returns `None` if the required turn failed.
    pub fn face<A: Actuator>(&mut self, body: &mut A, direction: Direction) -> Result<Option<Face>> {
        match direction.heading() {
            None if direction == Direction::Up => Ok(Some(Face::Up)),
            None => Ok(Some(Face::Down)),
            Some(heading) => Ok(self.turn_to(body, heading)?.then_some(Face::Front)),
        }
    }
}

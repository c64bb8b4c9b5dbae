//! Backtracking record for depth-first vein exploration.

use serde::{Deserialize, Serialize};

use crate::core::types::{Axis, Direction, Position};

/// One single-axis unit move into a newly excavated vein cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub axis: Axis,
    /// Coordinate on `axis` the expansion lands on.
    pub target: i64,
    /// Coordinate on `axis` before the expansion; backtracking returns here.
    pub origin: i64,
    /// The entered cell held a rare material.
    #[serde(default)]
    pub rare: bool,
}

impl PathEntry {
    pub fn expansion(from: Position, direction: Direction, rare: bool) -> Self {
        let axis = direction.axis();
        let origin = from.get(axis);
        Self {
            axis,
            target: origin + direction.sign(),
            origin,
            rare,
        }
    }

    /// Direction that re-issues this expansion.
    pub fn forward(&self) -> Direction {
        Direction::along(self.axis, self.target - self.origin).unwrap_or(Direction::Up)
    }
}

/// Expansions in visitation order; empty exactly at the vein entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathStack {
    entries: Vec<PathEntry>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PathEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<PathEntry> {
        self.entries.pop()
    }

    pub fn top(&self) -> Option<&PathEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Positions visited when replaying the stack forward from `entry`.
    ///
    /// Element `i` is the position after `i` expansions, so the result has
    /// `len() + 1` elements and starts with `entry`.
    pub fn replay(&self, entry: Position) -> Vec<Position> {
        let mut positions = Vec::with_capacity(self.entries.len() + 1);
        let mut current = entry;
        positions.push(current);
        for step in &self.entries {
            current = current.with(step.axis, step.target);
            positions.push(current);
        }
        positions
    }
}

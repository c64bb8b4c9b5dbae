//! Grid geometry shared by every component.
//!
//! Axis convention: East = +x, Up = +y, South = +z. Only the four horizontal
//! headings are turnable; vertical moves never change heading.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Horizontal facing, in clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Heading {
    #[default]
    North,
    East,
    South,
    West,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    fn index(self) -> u8 {
        match self {
            Heading::North => 0,
            Heading::East => 1,
            Heading::South => 2,
            Heading::West => 3,
        }
    }

    fn from_index(index: u8) -> Self {
        Self::ALL[usize::from(index % 4)]
    }

    /// Heading after one right (clockwise) turn.
    pub fn right(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Heading after one left (counter-clockwise) turn.
    pub fn left(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// Clockwise quarter turns needed to go from `self` to `target` (0..=3).
    pub fn quarter_turns_to(self, target: Heading) -> u8 {
        (target.index() + 4 - self.index()) % 4
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Direction::from(*self), f)
    }
}

/// One of the six unit directions of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Fixed neighbour probing order: vertical first, then clockwise horizontals.
    pub const PROBE_ORDER: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn heading(self) -> Option<Heading> {
        match self {
            Direction::North => Some(Heading::North),
            Direction::East => Some(Heading::East),
            Direction::South => Some(Heading::South),
            Direction::West => Some(Heading::West),
            Direction::Up | Direction::Down => None,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::X,
            Direction::Up | Direction::Down => Axis::Y,
            Direction::North | Direction::South => Axis::Z,
        }
    }

    /// +1 or -1 along [`Direction::axis`].
    pub fn sign(self) -> i64 {
        match self {
            Direction::East | Direction::Up | Direction::South => 1,
            Direction::West | Direction::Down | Direction::North => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Direction that moves along `axis` with the sign of `delta`.
    ///
    /// Returns `None` for a zero delta.
    pub fn along(axis: Axis, delta: i64) -> Option<Self> {
        let positive = match delta.signum() {
            0 => return None,
            1 => true,
            _ => false,
        };
        Some(match (axis, positive) {
            (Axis::X, true) => Direction::East,
            (Axis::X, false) => Direction::West,
            (Axis::Y, true) => Direction::Up,
            (Axis::Y, false) => Direction::Down,
            (Axis::Z, true) => Direction::South,
            (Axis::Z, false) => Direction::North,
        })
    }
}

impl From<Heading> for Direction {
    fn from(heading: Heading) -> Self {
        match heading {
            Heading::North => Direction::North,
            Heading::East => Direction::East,
            Heading::South => Direction::South,
            Heading::West => Direction::West,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// The horizontal axis that is not `self` (`X` <-> `Z`).
    pub fn other_horizontal(self) -> Option<Axis> {
        match self {
            Axis::X => Some(Axis::Z),
            Axis::Z => Some(Axis::X),
            Axis::Y => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Relative face of the agent through which actuator calls act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Up,
    Down,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(default)]
pub struct Position {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0, z: 0 };

    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn with(mut self, axis: Axis, value: i64) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    /// The neighbouring cell one unit step away.
    pub fn step(self, direction: Direction) -> Self {
        let axis = direction.axis();
        self.with(axis, self.get(axis) + direction.sign())
    }

    pub fn manhattan(&self, other: &Position) -> u64 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Position plus heading: everything dead reckoning knows about the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Pose {
    #[serde(flatten)]
    pub position: Position,
    pub heading: Heading,
}

impl Pose {
    pub const fn new(position: Position, heading: Heading) -> Self {
        Self { position, heading }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} facing {}", self.position, self.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_wrap_around() {
        assert_eq!(Heading::North.left(), Heading::West);
        assert_eq!(Heading::West.right(), Heading::North);
        assert_eq!(Heading::East.opposite(), Heading::West);
    }

    #[test]
    fn quarter_turns_are_clockwise() {
        assert_eq!(Heading::North.quarter_turns_to(Heading::North), 0);
        assert_eq!(Heading::North.quarter_turns_to(Heading::East), 1);
        assert_eq!(Heading::North.quarter_turns_to(Heading::South), 2);
        assert_eq!(Heading::North.quarter_turns_to(Heading::West), 3);
        assert_eq!(Heading::West.quarter_turns_to(Heading::North), 1);
    }

    #[test]
    fn step_follows_axis_convention() {
        let origin = Position::ORIGIN;
        assert_eq!(origin.step(Direction::East), Position::new(1, 0, 0));
        assert_eq!(origin.step(Direction::North), Position::new(0, 0, -1));
        assert_eq!(origin.step(Direction::Down), Position::new(0, -1, 0));
    }

    #[test]
    fn along_picks_signed_direction() {
        assert_eq!(Direction::along(Axis::X, 3), Some(Direction::East));
        assert_eq!(Direction::along(Axis::Z, -2), Some(Direction::North));
        assert_eq!(Direction::along(Axis::Y, 0), None);
    }

    #[test]
    fn pose_serializes_flat() {
        let pose = Pose::new(Position::new(1, -2, 3), Heading::South);
        let json = serde_json::to_string(&pose).expect("serialize");
        assert_eq!(json, r#"{"x":1,"y":-2,"z":3,"heading":"south"}"#);
    }

    #[test]
    fn pose_fills_missing_fields_with_defaults() {
        let pose: Pose = serde_json::from_str(r#"{"x":4}"#).expect("parse");
        assert_eq!(pose, Pose::new(Position::new(4, 0, 0), Heading::North));
    }
}

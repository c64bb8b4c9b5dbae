//! Physical primitives the agent drives.
//!
//! The [`Actuator`] and [`Storage`] traits decouple the core from whatever
//! moves the agent. Every call blocks until the primitive completes and
//! reports plain success/failure; no call is retried behind the caller's
//! back. Tests and the simulator use `test_support::GridWorld`.

use crate::core::capacity::Slot;
use crate::core::types::Face;

/// Movement, turning, probing and digging primitives.
pub trait Actuator {
    fn forward(&mut self) -> bool;
    fn back(&mut self) -> bool;
    fn up(&mut self) -> bool;
    fn down(&mut self) -> bool;
    fn turn_left(&mut self) -> bool;
    fn turn_right(&mut self) -> bool;
    /// Material id of the cell at `face`, `None` when it is empty.
    fn inspect(&mut self, face: Face) -> Option<String>;
    /// Remove the cell at `face`, collecting what it yields.
    fn dig(&mut self, face: Face) -> bool;
}

/// Local inventory and transfers against adjacent containers.
///
/// Contents may change outside the agent's control between calls, so every
/// read is a snapshot for one decision only.
pub trait Storage {
    fn slots(&mut self) -> Vec<Slot>;
    /// Move up to `count` units from `slot` into the container at `face`.
    ///
    /// Returns the units actually transferred; 0 signals a full destination.
    fn deposit(&mut self, slot: usize, face: Face, count: u32) -> u32;
    /// Current fuel, `None` when the agent needs no fuel.
    fn fuel_level(&mut self) -> Option<u32>;
    /// Pull fuel from the container at `face` and burn it.
    ///
    /// Returns the fuel gained; 0 means the source yielded nothing.
    fn refuel(&mut self, face: Face) -> u32;
}

/// Everything a task step needs from the physical agent.
pub trait Agent: Actuator + Storage {}

impl<T: Actuator + Storage> Agent for T {}

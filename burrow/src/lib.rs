//! Dead-reckoning excavation agent.
//!
//! The agent has no way to ask the world where it is. It tracks its own pose
//! by counting every successful move and turn, persists that pose before
//! doing anything else, and drives long-running tasks as resumable step
//! machines whose state is saved after every step.
//!
//! - **[`core`]**: Pure, deterministic data and rules (geometry, material
//!   classes, slot capacity, path stack, transitions). No I/O.
//! - **[`io`]**: The physical primitive seam, state files, config, materials
//!   and the operator prompt.
//!
//! Behavior is layered on top: [`tracker`] owns the pose, [`excavator`]
//! removes blocks without overfilling storage, [`homing`] and [`vein`] are
//! reusable sub-machines, [`tasks`] holds the concrete tasks and [`looping`]
//! runs any of them. [`start`] and [`validate`] back the CLI commands.

pub mod core;
pub mod excavator;
pub mod exit_codes;
pub mod homing;
pub mod io;
pub mod logging;
pub mod looping;
pub mod machine;
pub mod start;
pub mod tasks;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tracker;
pub mod validate;
pub mod vein;

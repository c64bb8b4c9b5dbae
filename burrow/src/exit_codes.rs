//! Stable exit codes for burrow CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to a missing layout, invalid config/materials/state, or other errors.
pub const INVALID: i32 = 1;
/// `burrow status` found a finished task.
pub const COMPLETE: i32 = 2;
/// `burrow status` found a task halted on a fatal, awaiting the operator.
pub const HALTED: i32 = 3;

//! Deterministic, pure logic shared by the agent core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod capacity;
pub mod invariants;
pub mod materials;
pub mod path_stack;
pub mod transition;
pub mod types;

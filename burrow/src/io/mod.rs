//! I/O helpers: physical primitives, state files, config, operator.

pub mod actuator;
pub mod config;
pub mod init;
pub mod materials;
pub mod operator;
pub mod store;

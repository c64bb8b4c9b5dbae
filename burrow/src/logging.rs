//! Diagnostic tracing for the agent and the simulator.
//!
//! Tracing output is not state: nothing here is persisted and nothing the
//! agent does depends on it. Durable progress lives in `.burrow/state/`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output goes to stderr in compact
/// format so stdout stays clean for command output.
///
/// # Example
/// ```bash
/// RUST_LOG=burrow=debug sim run branch-small
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

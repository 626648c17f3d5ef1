pub mod config;
pub mod errors;
pub mod formatting;
pub mod logging;

/// Component tag used as the `target` of every tracing span emitted by the orchestrator crates.
pub const COMPONENT: &str = "orchestrator";

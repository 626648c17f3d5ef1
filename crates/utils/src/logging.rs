use tracing::subscriber::{self, Subscriber};
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber for the process.
///
/// Honours `RUST_LOG`, defaulting to `info` plus axum's extractor-rejection traces, which are
/// otherwise only logged at `trace` level.
pub fn setup_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    subscriber::set_global_default(subscriber())
}

pub fn subscriber() -> impl Subscriber + core::fmt::Debug {
    tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_target(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "info,axum::rejection=trace".into()
        }))
        .finish()
}

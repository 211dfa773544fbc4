use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Initializes stderr logging. Verbosity is driven by `ATELIER_LOG`
/// (falling back to `RUST_LOG`), defaulting to warnings only so progress
/// output stays readable.
pub fn setup_logging() -> Result<()> {
    let filter = EnvFilter::try_from_env("ATELIER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to set global logging subscriber: {}", e))
}

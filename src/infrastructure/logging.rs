//! Logging initialization.
//!
//! Console output through `tracing-subscriber`, filtered by `RUST_LOG`
//! with an `info` default.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("initializing logging: {e}"))
}

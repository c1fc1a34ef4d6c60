//! Tracing subscriber setup.
//!
//! Console output only: a compact `fmt` layer filtered by `RUST_LOG`, falling
//! back to the level chosen on the command line.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(log_level: Level) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

//! rJMX-Collector library
//!
//! This crate queries MBean attributes from Java applications via Jolokia
//! and maps them onto labeled, typed metric sets grouped by entity, driven
//! by declarative collection definitions.

pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod integration;
pub mod runner;
pub mod transformer;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// Logs go to stderr; stdout carries the published payload.
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

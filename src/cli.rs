//! CLI argument parsing for rJMX-Collector
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--collection-files`: Comma separated absolute paths of YAML collection files (env: COLLECTION_FILES)
//! - `--collection-config`: Inline JSON collection definition (env: COLLECTION_CONFIG)
//! - `--jolokia-url`: Jolokia endpoint URL (env: JOLOKIA_URL)
//! - `--username` / `--password`: JMX credentials (env: JMX_USER / JMX_PASS)
//! - `--timeout`: Query timeout in milliseconds (env: TIMEOUT)
//! - `--jmx-host` / `--jmx-port`: Monitored JVM, used for entity identity (env: JMX_HOST / JMX_PORT)
//! - `--connection-url`: JMX service URL, overrides host and port for identity (env: CONNECTION_URL)
//! - `--metric-limit`: Maximum metrics per entity, 0 for unlimited (env: METRIC_LIMIT)
//! - `--local-entity` / `--remote-monitoring`: Entity addressing mode (env: LOCAL_ENTITY / REMOTE_MONITORING)
//! - `--long-running`, `--interval`, `--heartbeat-interval`: Repeated collection (env: LONG_RUNNING / INTERVAL / HEARTBEAT_INTERVAL)
//! - `--pretty`: Indent the published JSON
//! - `--validate`: Validate the collection definitions and exit
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: LOG_LEVEL)
//!
//! # Precedence
//!
//! Values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Default values

use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::config::JolokiaConfig;
use crate::runner::RunOptions;
use crate::transformer::{AddressingMode, CollectionContext};

/// rJMX-Collector - JMX bean collection integration written in Rust
///
/// Queries MBeans through Jolokia, maps the attributes onto labeled metric
/// sets according to collection definitions and prints the result as JSON.
///
/// Environment variables can be used for all configuration options.
/// CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(name = "rjmx-collector")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Comma separated list of absolute paths to collection definition files
    #[arg(long, value_name = "FILES", env = "COLLECTION_FILES")]
    pub collection_files: Option<String>,

    /// Collection definition as inline JSON
    #[arg(long, value_name = "JSON", env = "COLLECTION_CONFIG")]
    pub collection_config: Option<String>,

    /// Jolokia endpoint URL
    #[arg(
        long,
        value_name = "URL",
        default_value = "http://localhost:8778/jolokia",
        env = "JOLOKIA_URL"
    )]
    pub jolokia_url: String,

    /// JMX username
    #[arg(long, value_name = "USERNAME", env = "JMX_USER")]
    pub username: Option<String>,

    /// JMX password
    #[arg(long, value_name = "PASSWORD", env = "JMX_PASS")]
    pub password: Option<String>,

    /// Query timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 10000, env = "TIMEOUT")]
    pub timeout: u64,

    /// Host running JMX
    #[arg(long, value_name = "HOST", default_value = "localhost", env = "JMX_HOST")]
    pub jmx_host: String,

    /// Port JMX is running on
    #[arg(long, value_name = "PORT", default_value = "9999", env = "JMX_PORT")]
    pub jmx_port: String,

    /// JMX service URL, e.g. service:jmx:rmi:///jndi/rmi://host:9999/jmxrmi
    #[arg(long, value_name = "URL", env = "CONNECTION_URL")]
    pub connection_url: Option<String>,

    /// Maximum number of metrics per domain entity, 0 for no limit
    #[arg(long, value_name = "N", default_value_t = 200, env = "METRIC_LIMIT")]
    pub metric_limit: usize,

    /// Report every domain under the local host entity
    #[arg(long, env = "LOCAL_ENTITY", conflicts_with = "remote_monitoring")]
    pub local_entity: bool,

    /// Identify domain entities by the remote endpoint
    #[arg(long, env = "REMOTE_MONITORING")]
    pub remote_monitoring: bool,

    /// Keep running and collect every --interval seconds
    #[arg(long, env = "LONG_RUNNING")]
    pub long_running: bool,

    /// Seconds between collections in long-running mode
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        env = "INTERVAL"
    )]
    pub interval: u64,

    /// Seconds between heartbeats in long-running mode
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..),
        env = "HEARTBEAT_INTERVAL"
    )]
    pub heartbeat_interval: u64,

    /// Indent the published JSON
    #[arg(long)]
    pub pretty: bool,

    /// Validate the collection definitions and exit
    #[arg(long)]
    pub validate: bool,

    /// Log level
    #[arg(short, long, value_enum, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: LogLevel,
}

impl Cli {
    /// Entity addressing mode selected by the flags
    pub fn addressing_mode(&self) -> AddressingMode {
        if self.local_entity {
            AddressingMode::Local
        } else if self.remote_monitoring {
            AddressingMode::Remote
        } else {
            AddressingMode::Default
        }
    }

    /// Context handed to the entity builder
    pub fn collection_context(&self) -> CollectionContext {
        let context = CollectionContext::new(self.jmx_host.as_str(), self.jmx_port.as_str())
            .with_mode(self.addressing_mode());
        match &self.connection_url {
            Some(url) => context.with_connection_url(url.as_str()),
            None => context,
        }
    }

    /// Jolokia transport settings
    pub fn jolokia_config(&self) -> JolokiaConfig {
        JolokiaConfig {
            url: self.jolokia_url.clone(),
            username: self.username.clone().filter(|u| !u.is_empty()),
            password: self.password.clone(),
            timeout_ms: self.timeout,
        }
    }

    /// Options of the collection passes
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            metric_limit: self.metric_limit,
            pretty: self.pretty,
            interval: Duration::from_secs(self.interval),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval),
            integration_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, then metrics
//!
//! # Design Decisions
//! - Fail fast: an unreadable or invalid config file is fatal
//! - A metrics endpoint that cannot start is logged, not fatal

use std::net::SocketAddr;
use std::path::Path;

use crate::config::{load_config, ConfigError, ServerConfig};
use crate::observability::{logging, metrics};

/// Load the config file if one was given, otherwise use defaults.
///
/// `port` overrides the port of the configured bind address.
pub fn resolve_config(path: Option<&Path>, port: Option<u16>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = port {
        config.listener.set_port(port);
    }
    Ok(config)
}

/// Bring up logging and, if enabled, the metrics exporter.
pub fn init_observability(config: &ServerConfig) {
    logging::init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        max_body_size = config.limits.max_body_size,
        shutdown_secs = config.timeouts.shutdown_secs,
        "Configuration loaded"
    );

    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse::<SocketAddr>() {
        Ok(addr) => {
            metrics::init_metrics(addr);
        }
        Err(e) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            error = %e,
            "Failed to parse metrics address"
        ),
    }
}

//! Configuration Module - TOML-based Exporter Configuration
//!
//! Loads and validates `config.toml` for the `promgroup-exporter`
//! binary. The library itself takes no configuration: metric shape lives
//! in the declarations.

pub mod loader;

use serde::Deserialize;

/// Top-level exporter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Exporter process settings.
    pub exporter: ExporterConfig,
}

/// Exporter process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    /// Human-readable instance name, attached to startup logs.
    pub name: String,
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Root namespace of the exporter's own metrics. May be empty.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Scrape endpoint bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Seconds between uptime gauge refreshes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_namespace() -> String {
    "promgroup".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_refresh_interval() -> u64 {
    15
}

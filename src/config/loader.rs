//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;

    info!(
        name = %config.exporter.name,
        namespace = %config.exporter.namespace,
        bind_address = %config.exporter.bind_address,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
    let exporter = &config.exporter;

    anyhow::ensure!(!exporter.name.is_empty(), "Exporter name must not be empty");
    anyhow::ensure!(
        LOG_LEVELS.contains(&exporter.log_level.as_str()),
        "log_level must be one of {:?}, got {}",
        LOG_LEVELS,
        exporter.log_level
    );
    anyhow::ensure!(
        exporter
            .namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'),
        "namespace may only contain [a-zA-Z0-9_], got {}",
        exporter.namespace
    );
    exporter
        .bind_address
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid bind_address: {}", exporter.bind_address))?;
    anyhow::ensure!(
        exporter.refresh_interval_seconds > 0,
        "refresh_interval_seconds must be positive"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config("[exporter]\nname = \"edge-01\"\n").unwrap();
        assert_eq!(config.exporter.log_level, "info");
        assert_eq!(config.exporter.namespace, "promgroup");
        assert_eq!(config.exporter.bind_address, "0.0.0.0:9090");
        assert_eq!(config.exporter.refresh_interval_seconds, 15);
    }

    #[test]
    fn test_empty_namespace_allowed() {
        let config = parse_config("[exporter]\nname = \"edge\"\nnamespace = \"\"\n").unwrap();
        assert!(config.exporter.namespace.is_empty());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse_config("[exporter]\nname = \"\"\n").is_err());
        assert!(parse_config("[exporter]\nname = \"edge\"\nlog_level = \"loud\"\n").is_err());
        assert!(parse_config("[exporter]\nname = \"edge\"\nnamespace = \"my-ns\"\n").is_err());
        assert!(parse_config("[exporter]\nname = \"edge\"\nbind_address = \"nowhere\"\n").is_err());
    }
}

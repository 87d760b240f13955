//! Configuration loader
//!
//! Loads and validates the YAML parser configuration.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use super::ParserConfig;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "ROUTEKIT_CONFIG";

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "routekit.yaml";

pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(config_path.into()),
        }
    }

    /// Loader that always yields the built-in defaults.
    pub fn defaults() -> Self {
        Self { config_path: None }
    }

    /// Create loader from ROUTEKIT_CONFIG or a `routekit.yaml` in the working directory
    ///
    /// Path resolution order:
    /// 1. ROUTEKIT_CONFIG environment variable (explicit override)
    /// 2. Relative `routekit.yaml`
    /// 3. Built-in defaults
    pub fn from_env() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::new(path);
        }

        if Path::new(CONFIG_FILE).exists() {
            return Self::new(CONFIG_FILE);
        }

        Self::defaults()
    }

    /// Load and validate the configuration
    pub fn load(&self) -> Result<ParserConfig> {
        let Some(path) = &self.config_path else {
            info!("Using default parser configuration");
            return Ok(ParserConfig::default());
        };

        info!("Loading parser configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<ParserConfig> {
        // An empty document deserializes to unit, not to an all-default struct.
        if content.trim().is_empty() {
            return Ok(ParserConfig::default());
        }
        let config: ParserConfig = serde_yaml::from_str(content)?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &ParserConfig) -> Result<()> {
        if config.route_probe_lines == 0 {
            return Err(anyhow!("route_probe_lines must be at least 1"));
        }
        if config.object_probe_lines == 0 {
            return Err(anyhow!("object_probe_lines must be at least 1"));
        }
        if config.default_gauge.is_nan() || config.default_gauge <= 0.0 {
            return Err(anyhow!(
                "default_gauge must be positive, got {}",
                config.default_gauge
            ));
        }
        if config.default_stop_duration < 0.0 {
            return Err(anyhow!(
                "default_stop_duration must not be negative, got {}",
                config.default_stop_duration
            ));
        }
        if encoding_rs::Encoding::for_label(config.legacy_encoding.as_bytes()).is_none() {
            return Err(anyhow!(
                "legacy_encoding '{}' is not a known encoding label",
                config.legacy_encoding
            ));
        }
        Ok(())
    }
}

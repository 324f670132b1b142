//! Configuration loading for the filter specification.
//!
//! The filter itself is a pure function of two strings; this module only
//! covers where the specification string comes from: a TOML config file,
//! the `IPGATE_IP_FILTER` environment variable, or both (env wins).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable holding the filter specification
pub const IP_FILTER_ENV: &str = "IPGATE_IP_FILTER";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Comma-separated list of allowed addresses, CIDR ranges, and `*`.
    /// `None` means no filter is configured (the gate is off).
    #[serde(default)]
    pub ip_filter: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Read configuration from the environment only.
    pub fn from_env() -> Self {
        Self {
            ip_filter: std::env::var(IP_FILTER_ENV).ok(),
        }
    }

    /// Load from an optional file, with the environment taking precedence.
    pub fn load_or_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Config::default(),
        };
        if let Ok(value) = std::env::var(IP_FILTER_ENV) {
            config.ip_filter = Some(value);
        }
        Ok(config)
    }
}

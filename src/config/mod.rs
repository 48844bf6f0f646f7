//! Configuration management for weaver

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the Weaver API.
    pub base_url: String,
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Use the streaming SSE transport unless the CLI says otherwise.
    pub streaming: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { streaming: true }
    }
}

impl Config {
    /// Path of the user config file, if a config directory exists on this
    /// platform.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weaver").join("config.toml"))
    }

    /// Load the user config, falling back to defaults when the file is
    /// missing or unreadable. A file that exists but fails to parse is
    /// reported and ignored rather than aborting the command.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match Self::load_from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("ignoring malformed config at {}: {:#}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn load_from_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse config file")
    }
}

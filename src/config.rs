//! Configuration Management
//!
//! Handles persistent configuration for the discovery layer: which project
//! and zones to serve, cache strategy, graph expansion limits, API
//! endpoints and log level.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gcp::Endpoints;
use crate::logging::LogLevel;

/// Zone used when neither config nor environment names one
pub const DEFAULT_ZONE: &str = "us-central1-a";

/// Which [`crate::cache::Cache`] implementation adapters share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Never cache; every query reaches the backend
    None,
    /// In-memory cache with per-entry TTL
    #[default]
    Ttl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub strategy: CacheStrategy,
    /// TTL applied when a wrapper does not declare its own
    pub default_ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strategy: CacheStrategy::Ttl,
            default_ttl_secs: 600,
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Which linked item queries graph expansion follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkFollow {
    /// Every link
    #[default]
    All,
    /// Only links a change to the source item can propagate across
    BlastRadius,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub max_depth: usize,
    /// Linked queries in flight at once per expansion level
    pub concurrency: usize,
    pub follow: LinkFollow,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            concurrency: 8,
            follow: LinkFollow::All,
        }
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Project to discover in
    #[serde(default)]
    pub project_id: Option<String>,
    /// Zones zonal kinds are served in
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tgcp").join("discovery.json"))
    }

    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.endpoints.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective project (config > GOOGLE_CLOUD_PROJECT > CLOUDSDK_CORE_PROJECT)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| env_non_empty("GOOGLE_CLOUD_PROJECT"))
            .or_else(|| env_non_empty("CLOUDSDK_CORE_PROJECT"))
    }

    /// Get effective zones (config > CLOUDSDK_COMPUTE_ZONE > default)
    pub fn effective_zones(&self) -> Vec<String> {
        if !self.zones.is_empty() {
            return self.zones.clone();
        }
        vec![env_non_empty("CLOUDSDK_COMPUTE_ZONE").unwrap_or_else(|| DEFAULT_ZONE.to_string())]
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

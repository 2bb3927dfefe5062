//! Connector configuration management.
//!
//! The configuration names where places come from (a JSON file or a URL)
//! and how long a retrieved snapshot stays fresh.
//!
//! Configuration is stored at `~/.config/belfiore/config.json`. The
//! `BELFIORE_SOURCE_URL`, `BELFIORE_SOURCE_PATH` and `BELFIORE_LIFETIME_SEC`
//! environment variables override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connector::{BelfioreConnector, ConnectorOptions};
use crate::source::{HttpSource, JsonFileSource};

/// Application name used for config directory paths
const APP_NAME: &str = "belfiore";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default snapshot lifetime: one day.
/// Registries change a few times a year, so daily refreshes are plenty.
pub const DEFAULT_LIFETIME_SEC: u64 = 86_400;

pub const ENV_SOURCE_URL: &str = "BELFIORE_SOURCE_URL";
pub const ENV_SOURCE_PATH: &str = "BELFIORE_SOURCE_PATH";
pub const ENV_LIFETIME_SEC: &str = "BELFIORE_LIFETIME_SEC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub source_url: Option<String>,
    pub source_path: Option<PathBuf>,
    #[serde(default = "default_lifetime_sec")]
    pub lifetime_sec: Option<u64>,
}

fn default_lifetime_sec() -> Option<u64> {
    Some(DEFAULT_LIFETIME_SEC)
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            source_path: None,
            lifetime_sec: default_lifetime_sec(),
        }
    }
}

impl ConnectorConfig {
    /// Load the user config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_SOURCE_URL).filter(|v| !v.is_empty()) {
            self.source_url = Some(url);
        }
        if let Some(path) = lookup(ENV_SOURCE_PATH).filter(|v| !v.is_empty()) {
            self.source_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_LIFETIME_SEC) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.lifetime_sec = Some(secs),
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid {}", ENV_LIFETIME_SEC),
            }
        }
    }

    /// Build a connector over the configured source.
    /// A local file takes precedence over a URL.
    pub fn connector(&self) -> Result<BelfioreConnector> {
        let mut options = ConnectorOptions::new();
        if let Some(secs) = self.lifetime_sec {
            options = options.lifetime_sec(secs);
        }

        let connector = if let Some(ref path) = self.source_path {
            BelfioreConnector::from_retriever(JsonFileSource::new(path), options)?
        } else if let Some(ref url) = self.source_url {
            BelfioreConnector::from_retriever(HttpSource::new(url)?, options)?
        } else {
            anyhow::bail!(
                "No places source configured: set source_path or source_url in {} or {}/{}",
                CONFIG_FILE,
                ENV_SOURCE_PATH,
                ENV_SOURCE_URL
            );
        };
        Ok(connector)
    }
}

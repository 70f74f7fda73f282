//! Configuration module
//!
//! CLI settings and the host configuration file. The host config is a JSON
//! object; its `hooks` key configures the hook pipeline and every other key is
//! visible to hooks and commands alike.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the host config file
    pub config_path: PathBuf,
    /// Debug-level logging was requested
    pub verbose: bool,
}

/// `<user config dir>/giftwise/config.json`
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine the user config directory")?;
    Ok(base.join("giftwise").join("config.json"))
}

/// The host config file, parsed
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub path: PathBuf,
    pub values: Map<String, Value>,
}

impl HostConfig {
    /// Reads `path`. A missing file is an empty config.
    ///
    /// The stored path is absolute, so relative hook scripts always resolve
    /// to absolute paths.
    pub fn load(path: &Path) -> Result<Self> {
        let path = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve config path {:?}", path))?;
        let path = path.as_path();

        if !path.exists() {
            tracing::debug!("No host config at {}, using defaults", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                values: Map::new(),
            });
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let parsed: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        let Value::Object(values) = parsed else {
            bail!("Config file {:?} must contain a JSON object", path);
        };

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// Base directory for relative hook script paths
    pub fn config_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }
}

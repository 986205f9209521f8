//! Configuration loader
//!
//! Loads the main config file and its drop-ins and merges them over the
//! built-in defaults.

use super::{WrapperConfig, merge};
use crate::ConfigDriveError;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default main configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/configdrive/config.yaml";

/// Drop-in directory name, resolved next to the main file
pub const DROPIN_DIR_NAME: &str = "config.d";

/// Configuration loader builder
pub struct ConfigLoader {
    path: PathBuf,
    include_dropins: bool,
}

impl ConfigLoader {
    /// Create a loader for the default config location
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CONFIG_PATH),
            include_dropins: true,
        }
    }

    /// Use a custom main config file
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    /// Skip loading drop-in configs
    pub fn skip_dropins(mut self) -> Self {
        self.include_dropins = false;
        self
    }

    /// Drop-in directory for the configured main file
    pub fn dropin_dir(&self) -> PathBuf {
        self.path
            .parent()
            .unwrap_or_else(|| Path::new("/"))
            .join(DROPIN_DIR_NAME)
    }

    /// Load and merge all layers
    pub async fn load(&self) -> Result<WrapperConfig, ConfigDriveError> {
        let mut layers = vec![serde_yaml::to_value(WrapperConfig::default())?];

        if let Some(main) = load_config_file(&self.path).await? {
            debug!("Loaded config from {}", self.path.display());
            layers.push(main);
        }

        if self.include_dropins {
            layers.extend(load_dropin_configs(self.dropin_dir()).await?);
        }

        let merged = merge::merge_all(&layers);
        serde_yaml::from_value(merged).map_err(|e| {
            ConfigDriveError::Config(format!("invalid configuration: {}", e))
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a single YAML file; a missing file is not an error
async fn load_config_file(path: impl AsRef<Path>) -> Result<Option<Value>, ConfigDriveError> {
    let path = path.as_ref();

    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let value = serde_yaml::from_str::<Value>(&content).map_err(|e| {
        ConfigDriveError::Config(format!("failed to parse {}: {}", path.display(), e))
    })?;
    Ok(Some(value))
}

/// Load all `*.yaml` drop-ins from a directory, sorted alphabetically
async fn load_dropin_configs(dir: impl AsRef<Path>) -> Result<Vec<Value>, ConfigDriveError> {
    let dir = dir.as_ref();

    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            entries.push(path);
        }
    }
    entries.sort();

    let mut configs = Vec::new();
    for path in entries {
        if let Some(config) = load_config_file(&path).await? {
            debug!("Loaded drop-in config from {}", path.display());
            configs.push(config);
        }
    }

    if !configs.is_empty() {
        info!("Loaded {} drop-in configs", configs.len());
    }
    Ok(configs)
}

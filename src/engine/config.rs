//! vdba Configuration Module
//! Handles loading and validating connection configuration files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MEMORY_DATABASE: &str = ":memory:";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// How the store file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    Readonly,
    #[default]
    Readwrite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database file, or `:memory:`
    pub database: PathBuf,
    #[serde(default)]
    pub mode: OpenMode,
    /// Create the file when missing (ignored in readonly mode)
    #[serde(default = "default_create")]
    pub create: bool,
}

fn default_create() -> bool {
    true
}

impl ConnectionConfig {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            mode: OpenMode::default(),
            create: default_create(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MEMORY_DATABASE)
    }

    pub fn readonly(mut self) -> Self {
        self.mode = OpenMode::Readonly;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.database.as_os_str() == MEMORY_DATABASE
    }

    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path.to_path_buf()));
        }
        let content = std::fs::read_to_string(config_path)?;
        let config: ConnectionConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph configuration, stored as RON.

use crate::history::DEFAULT_UNDO_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Config errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for [`GraphConfig`]
    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serializing the config failed
    #[error("Config write error: {0}")]
    Write(#[from] ron::Error),
}

/// Per-graph settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Maximum undo history depth, 0 for unbounded
    pub undo_limit: usize,
    /// Reject connections that would close a cycle
    pub acyclic: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            acyclic: true,
        }
    }
}

impl GraphConfig {
    /// Parse a config from RON; missing fields take their defaults
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::debug!("Loaded graph config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Render as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

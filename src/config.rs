//! YAML configuration for Nodescan.
//!
//! Every section is optional and falls back to the component defaults.
//!
//! ```yaml
//! version: "1.0"
//! log_level: "info"
//!
//! extract:
//!   window_size: 3
//!   max_text_chars: 600
//!   max_fingerprints: 500
//!
//! rank:
//!   slack: 2
//!
//! fetch:
//!   retention_days: 365
//!   fallback_window_secs: 604800
//!   parallel_index: false
//!
//! store:
//!   namespace: "fingerprints"
//!   backend:
//!     kind: redb
//!     path: "/var/lib/nodescan/fingerprints.redb"
//! ```

use std::fs;
use std::path::Path;

use fetch::FetchConfig;
use fpstore::StoreConfig;
use index::RankConfig;
use ngram::ExtractConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NodescanConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub rank: RankConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub store: StoreConfig,

    /// `tracing` filter directive used by the binary when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodescanConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            extract: ExtractConfig::default(),
            rank: RankConfig::default(),
            fetch: FetchConfig::default(),
            store: StoreConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl NodescanConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: NodescanConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.extract
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.fetch
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        if self.store.namespace.is_empty() {
            return Err(ConfigLoadError::Validation(
                "store.namespace must not be empty".into(),
            ));
        }
        if self.store.namespace.contains(':') {
            return Err(ConfigLoadError::Validation(format!(
                "store.namespace must not contain ':' (got {:?})",
                self.store.namespace
            )));
        }
        Ok(())
    }
}

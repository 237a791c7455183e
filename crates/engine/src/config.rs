//! Configuration via `rowkv.toml`
//!
//! A default `rowkv.toml` can be written next to the data; edit it to change
//! behavior of the query stages that read it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use rowkv_core::{Error, Result};

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "rowkv.toml";

/// Starting value of a maximum aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxSeed {
    /// Start from 0, so empty or all-negative input yields 0.
    #[default]
    Zero,
    /// Start from the first observed value; empty input still yields 0.
    FirstObserved,
}

/// Settings loaded from `rowkv.toml`.
///
/// # Example
///
/// ```toml
/// # Seed of max aggregations: "zero" (default) or "first"
/// max_seed = "zero"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowkvConfig {
    /// Seed mode of max aggregations: `"zero"` or `"first"`.
    #[serde(default = "default_max_seed_str")]
    pub max_seed: String,
}

fn default_max_seed_str() -> String {
    "zero".to_string()
}

impl Default for RowkvConfig {
    fn default() -> Self {
        Self {
            max_seed: default_max_seed_str(),
        }
    }
}

impl RowkvConfig {
    /// Parse the seed string into a [`MaxSeed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"zero"` or `"first"`.
    pub fn max_seed_mode(&self) -> Result<MaxSeed> {
        match self.max_seed.as_str() {
            "zero" => Ok(MaxSeed::Zero),
            "first" => Ok(MaxSeed::FirstObserved),
            other => Err(Error::config(format!(
                "Invalid max_seed '{}' in rowkv.toml. Expected \"zero\" or \"first\".",
                other
            ))),
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# rowkv configuration
#
# Seed of max aggregations: "zero" (default) or "first"
#   "zero"  = start from 0; all-negative input yields 0
#   "first" = start from the first value seen; empty input yields 0
max_seed = "zero"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: RowkvConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.max_seed_mode()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

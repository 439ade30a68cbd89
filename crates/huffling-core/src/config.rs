//! Codec configuration.

use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodecConfig {
    /// Size of the encode buffer owned by the codec (bytes)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Run the tree, code and decode-table validators after every build
    #[serde(default)]
    pub validate: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            validate: false,
        }
    }
}

impl CodecConfig {
    /// Configuration with the given buffer capacity and default flags.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Enable or disable post-build validation.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Parse a configuration from a JSON document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

fn default_capacity() -> usize {
    1024 * 1024 // 1MB
}

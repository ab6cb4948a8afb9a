//! Store configuration

use admit_rest::WarningLimits;
use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("failed to parse store config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed values are out of range
    #[error("invalid store config: {0}")]
    Invalid(String),
}

/// Tunables of a [`crate::Store`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Nested commit depth allowed through `invoke_update`
    pub max_update_recursion: u32,
    /// Limits for per-request warning recorders
    pub warnings: WarningLimits,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With nested commit depth
    #[inline]
    #[must_use]
    pub fn with_max_update_recursion(mut self, depth: u32) -> Self {
        self.max_update_recursion = depth;
        self
    }

    /// With warning limits
    #[inline]
    #[must_use]
    pub fn with_warning_limits(mut self, limits: WarningLimits) -> Self {
        self.warnings = limits;
        self
    }

    /// Parse and check a TOML document
    ///
    /// Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warnings.max_message_len == 0 {
            return Err(ConfigError::Invalid(
                "warnings.max_message_len must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_update_recursion: 1,
            warnings: WarningLimits::default(),
        }
    }
}

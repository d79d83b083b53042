//! Stepper configuration
//!
//! Loaded from TOML; every key is optional and falls back to its default.

use bpa_normalize::dates::offset_from_minutes;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest accepted distance from UTC, in minutes
pub const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// TOML was malformed or had wrong types
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// UTC offset outside ±14h
    #[error("utc offset of {0} minutes is out of range")]
    InvalidOffset(i32),

    /// A notice lifetime of zero
    #[error("{0} must be greater than zero")]
    ZeroTtl(&'static str),
}

/// Runtime settings for a stepper session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    /// Language passed to the label collaborator
    pub language: String,
    /// Error banner lifetime in milliseconds
    pub error_notice_ttl_ms: u64,
    /// Success banner lifetime in milliseconds
    pub success_notice_ttl_ms: u64,
    /// Local draft key cleared on entering create mode
    pub draft_cache_key: String,
    /// Offset used to normalize dates to local midnight
    pub utc_offset_minutes: i32,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            language: "EN".to_string(),
            error_notice_ttl_ms: 5000,
            success_notice_ttl_ms: 3000,
            draft_cache_key: "bpa-draft".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl StepperConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set language
    #[inline]
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set error banner lifetime
    #[inline]
    #[must_use]
    pub fn with_error_ttl_ms(mut self, ms: u64) -> Self {
        self.error_notice_ttl_ms = ms;
        self
    }

    /// Set success banner lifetime
    #[inline]
    #[must_use]
    pub fn with_success_ttl_ms(mut self, ms: u64) -> Self {
        self.success_notice_ttl_ms = ms;
        self
    }

    /// Set draft cache key
    #[inline]
    #[must_use]
    pub fn with_draft_cache_key(mut self, key: impl Into<String>) -> Self {
        self.draft_cache_key = key.into();
        self
    }

    /// Set UTC offset in minutes
    #[inline]
    #[must_use]
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `ConfigError::Parse` for malformed TOML, or any validation error
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `InvalidOffset` or `ZeroTtl`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.offset()?;
        if self.error_notice_ttl_ms == 0 {
            return Err(ConfigError::ZeroTtl("error_notice_ttl_ms"));
        }
        if self.success_notice_ttl_ms == 0 {
            return Err(ConfigError::ZeroTtl("success_notice_ttl_ms"));
        }
        Ok(())
    }

    /// Date offset
    ///
    /// # Errors
    /// `ConfigError::InvalidOffset` outside ±14h
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        if self.utc_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES.unsigned_abs() {
            return Err(ConfigError::InvalidOffset(self.utc_offset_minutes));
        }
        offset_from_minutes(self.utc_offset_minutes)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_minutes))
    }

    /// Error banner lifetime
    #[inline]
    #[must_use]
    pub fn error_ttl(&self) -> Duration {
        Duration::from_millis(self.error_notice_ttl_ms)
    }

    /// Success banner lifetime
    #[inline]
    #[must_use]
    pub fn success_ttl(&self) -> Duration {
        Duration::from_millis(self.success_notice_ttl_ms)
    }
}

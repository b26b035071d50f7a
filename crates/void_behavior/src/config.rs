//! Runtime configuration
//!
//! Settings come from, in priority order:
//!
//! 1. Environment variables (`VOID_BEHAVIOR_DIR`, `VOID_BEHAVIOR_DEBUG`,
//!    `VOID_BEHAVIOR_PRESERVE_STATE`)
//! 2. A TOML file
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! source_dir = "behaviors"
//! extension = "vs"
//! debug_symbols = true
//! required_references = ["core", "entity", "input"]
//! force_reclaim = true
//! reclaim_passes = 3
//! preserve_state = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable overriding [`RuntimeConfig::source_dir`]
pub const ENV_SOURCE_DIR: &str = "VOID_BEHAVIOR_DIR";
/// Environment variable overriding [`RuntimeConfig::debug_symbols`]
pub const ENV_DEBUG: &str = "VOID_BEHAVIOR_DEBUG";
/// Environment variable overriding [`RuntimeConfig::preserve_state`]
pub const ENV_PRESERVE_STATE: &str = "VOID_BEHAVIOR_PRESERVE_STATE";

/// Configuration for the behavior runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory holding one source file per behavior unit
    pub source_dir: PathBuf,
    /// Source file extension, without the dot
    pub extension: String,
    /// Emit a debug image so callback failures point at source lines
    pub debug_symbols: bool,
    /// Host modules that must exist before anything is compiled
    pub required_references: Vec<String>,
    /// Run every reclamation pass on unload instead of a single one
    pub force_reclaim: bool,
    /// Number of passes when `force_reclaim` is set
    pub reclaim_passes: u32,
    /// Carry field values across a hot swap
    pub preserve_state: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("behaviors"),
            extension: "vs".to_string(),
            debug_symbols: cfg!(debug_assertions),
            required_references: vec!["core".into(), "entity".into(), "input".into()],
            force_reclaim: cfg!(debug_assertions),
            reclaim_passes: 3,
            preserve_state: false,
        }
    }
}

impl RuntimeConfig {
    /// Default configuration rooted at a source directory
    pub fn with_source_dir(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded behavior config from {}", path.display());
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_SOURCE_DIR) {
            if !dir.is_empty() {
                self.source_dir = PathBuf::from(dir);
                log::info!("Behavior directory from env: {}", self.source_dir.display());
            }
        }

        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug_symbols = parse_flag(ENV_DEBUG, &value)?;
        }

        if let Some(value) = lookup(ENV_PRESERVE_STATE) {
            self.preserve_state = parse_flag(ENV_PRESERVE_STATE, &value)?;
        }

        self.validate()
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(ConfigError::invalid(
                "extension",
                format!("'{}' is not a bare file extension", self.extension),
            ));
        }
        if self.reclaim_passes == 0 {
            return Err(ConfigError::invalid("reclaim_passes", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("'{}' is not a boolean", other))),
    }
}

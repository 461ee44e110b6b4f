//! Parser limits, optionally loaded from a TOML file.
//!
//! The file is optional. A missing or empty file yields
//! `ParserConfig::default()`, and unknown keys are logged and ignored.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::sax::DEFAULT_INTERN_CAPACITY;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Limits applied by the parse entry points.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Feed inputs larger than this are rejected before parsing.
    pub max_input_bytes: usize,

    /// Deepest `<outline>` nesting accepted in OPML.
    pub max_opml_depth: usize,

    /// Entries kept by the SAX engine's name interner.
    pub intern_capacity: usize,

    pub strip: StripConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 10 * 1024 * 1024,
            max_opml_depth: 50,
            intern_capacity: DEFAULT_INTERN_CAPACITY,
            strip: StripConfig::default(),
        }
    }
}

/// Output bounds for HTML stripping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub max_characters: usize,
    pub max_output_bytes: usize,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            max_characters: 300,
            max_output_bytes: 4096,
        }
    }
}

impl ParserConfig {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] =
        ["max_input_bytes", "max_opml_depth", "intern_capacity", "strip"];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(ParserConfig::default())`
    /// - Empty file → `Ok(ParserConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parses configuration text. Blank input yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: ParserConfig = toml::from_str(content)?;
        tracing::info!(
            max_input_bytes = config.max_input_bytes,
            max_opml_depth = config.max_opml_depth,
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

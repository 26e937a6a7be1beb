//! Engine configuration and file loading.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, Result};

/// Tunable behavior of the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Match command names and aliases case-insensitively.
    pub case_insensitive_commands: bool,
    /// Match literal-constrained parameters case-insensitively.
    pub case_insensitive_literals: bool,
    /// Let variadic parameters bind an empty sequence instead of
    /// failing. Per-parameter overrides win over this.
    pub allow_empty_variadic: bool,
    /// Reply lightly when a valid prefix is followed by an unknown
    /// command name.
    pub report_unknown_commands: bool,
    /// Upper bound on a single argument conversion.
    pub conversion_timeout: Option<Duration>,
    /// Upper bound on a handler invocation.
    pub handler_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            case_insensitive_commands: false,
            case_insensitive_literals: false,
            allow_empty_variadic: false,
            report_unknown_commands: true,
            conversion_timeout: None,
            handler_timeout: None,
        }
    }
}

/// Loads and saves engine configuration files.
pub struct ConfigManager;

impl ConfigManager {
    pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| CommandError::Config(format!("failed to read config file: {e}")))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| CommandError::Config(format!("failed to read config file: {e}")))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads a config file, detecting the format from the extension.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
        let path = path.as_ref();
        match extension(path) {
            "yaml" | "yml" => Self::load_from_yaml(path),
            "json" => Self::load_from_json(path),
            _ => Err(CommandError::Config(
                "unsupported file format; use .yaml, .yml, or .json".to_string(),
            )),
        }
    }

    pub fn save_to_yaml<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<()> {
        let content = serde_yaml::to_string(config)?;
        fs::write(path, content)
            .map_err(|e| CommandError::Config(format!("failed to write config file: {e}")))?;
        Ok(())
    }

    pub fn save_to_json<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)
            .map_err(|e| CommandError::Config(format!("failed to write config file: {e}")))?;
        Ok(())
    }

    /// Saves a config file, detecting the format from the extension.
    pub fn save_to_file<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension(path) {
            "yaml" | "yml" => Self::save_to_yaml(config, path),
            "json" => Self::save_to_json(config, path),
            _ => Err(CommandError::Config(
                "unsupported file format; use .yaml, .yml, or .json".to_string(),
            )),
        }
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

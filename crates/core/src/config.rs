//! Config file parsing for `~/.config/representative-creation/config.toml`.
//!
//! Use `AppConfig::ruleset` to build the metadata schema from the loaded
//! config; the `[resolver]` table is handed to the resolver as-is.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::schema::{default_anchor_types, default_metadata_types, Ruleset};

/// Structural type searched for when nothing else is configured.
pub const DEFAULT_STRUCTURAL_ELEMENT: &str = "TitlePage";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Structural type expected to reference the representative page.
    #[serde(default = "default_structural_element")]
    pub structural_element: String,
    /// Written to the process audit log when no such element exists.
    pub error_message: Option<String>,
    /// Earlier workflow step to reopen when no such element exists.
    pub fallback_step: Option<String>,
}

fn default_structural_element() -> String {
    DEFAULT_STRUCTURAL_ELEMENT.to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            structural_element: default_structural_element(),
            error_message: None,
            fallback_step: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_metadata_types")]
    pub metadata_types: Vec<String>,
    #[serde(default = "default_anchor_types")]
    pub anchor_types: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            metadata_types: default_metadata_types(),
            anchor_types: default_anchor_types(),
        }
    }
}

impl AppConfig {
    pub fn ruleset(&self) -> Ruleset {
        Ruleset::new(
            self.schema.metadata_types.iter().cloned(),
            self.schema.anchor_types.iter().cloned(),
        )
    }

    /// Set a value by dot-separated key, e.g. `resolver.fallback_step`.
    /// An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let optional = || (!value.is_empty()).then(|| value.to_string());
        let list = || {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        };
        let parts: Vec<&str> = key.splitn(2, '.').collect();
        match parts.as_slice() {
            ["resolver", sub] => match *sub {
                "structural_element" => self.resolver.structural_element = value.to_string(),
                "error_message" => self.resolver.error_message = optional(),
                "fallback_step" => self.resolver.fallback_step = optional(),
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            },
            ["schema", sub] => match *sub {
                "metadata_types" => self.schema.metadata_types = list(),
                "anchor_types" => self.schema.anchor_types = list(),
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            },
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

/// Load config from the default path. Missing or unreadable files yield defaults.
pub fn load_config() -> AppConfig {
    let Some(path) = config_path() else {
        return AppConfig::default();
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match load_config_from(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Falling back to default config: {}", e);
            AppConfig::default()
        }
    }
}

/// Load config from an explicit path, reporting read and parse failures.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("representative-creation");
        p.push("config.toml");
        p
    })
}

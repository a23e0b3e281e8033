//! Configuration for stackslice

mod extract;
mod logging;

pub use extract::ExtractConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "stackslice.toml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Extraction target
    #[serde(default)]
    pub extract: ExtractConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write this configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Validate all configuration fields.
    ///
    /// Collects every problem and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();
        let extract = &self.extract;

        if extract.user_id.trim().is_empty() {
            errors.push("user_id must not be empty".to_string());
        } else if !extract.user_id.chars().all(|c| c.is_ascii_digit()) {
            errors.push(format!("user_id must be numeric, got '{}'", extract.user_id));
        }

        if extract.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }

        for (name, value) in [
            ("posts_file", &extract.posts_file),
            ("history_file", &extract.history_file),
            ("cache_file", &extract.cache_file),
            ("output_file", &extract.output_file),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{} must not be empty", name));
            }
        }

        if !extract.cache_file.is_empty() && extract.cache_file == extract.output_file {
            errors.push(format!(
                "cache_file and output_file must differ (both are '{}')",
                extract.cache_file
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

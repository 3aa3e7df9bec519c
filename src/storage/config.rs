//! Configuration handling for Quillpress
//!
//! Configuration is read from `quillpress.toml` in the working directory,
//! falling back to the user config dir (`~/.config/quillpress/config.toml`).
//! The site section feeds the normalizer; nothing in the pipeline reads
//! ambient process state.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::images::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Site identity used by the normalizer.
///
/// An explicit dependency of pipeline construction rather than ambient
/// state, so normalization is unit-testable without environment setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and authority, e.g. `https://example.com`
    pub root_url: String,

    /// Optional base path the site is mounted under, e.g. `/blog`
    pub base_name: String,
}

impl SiteConfig {
    pub fn new(root_url: impl Into<String>, base_name: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            base_name: base_name.into(),
        }
    }

    /// Host prefix for path-relative URLs
    pub fn host(&self) -> String {
        format!("{}{}", self.root_url.trim_end_matches('/'), self.base_name)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_url: "http://localhost:4000".to_string(),
            base_name: String::new(),
        }
    }
}

/// Retry settings for the image dimension probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

impl ImagesConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,

    /// Path to the SQLite database; defaults next to the config file
    pub database: Option<PathBuf>,

    pub images: ImagesConfig,
}

impl AppConfig {
    /// Loads configuration, preferring a project-local file.
    ///
    /// Missing files are not an error; defaults apply.
    pub fn load(dir: &Path) -> Result<Self> {
        let local = dir.join("quillpress.toml");
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(dirs) = ProjectDirs::from("", "", "quillpress") {
            let global = dirs.config_dir().join("config.toml");
            if global.exists() {
                return Self::from_file(&global);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Resolved database path for a project directory
    pub fn database_path(&self, dir: &Path) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| dir.join("quillpress.db"))
    }

    /// Writes the default configuration to a project directory
    pub fn write_default(dir: &Path) -> Result<PathBuf> {
        let path = dir.join("quillpress.toml");
        let body = toml::to_string_pretty(&Self::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        fs::write(&path, body)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.site, SiteConfig::default());
    }

    #[test]
    fn local_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("quillpress.toml"),
            "[site]\nroot_url = \"https://example.com\"\nbase_name = \"/blog\"\n",
        )
        .unwrap();

        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.site.host(), "https://example.com/blog");
    }

    #[test]
    fn host_trims_trailing_slash() {
        let site = SiteConfig::new("https://example.com/", "");
        assert_eq!(site.host(), "https://example.com");
    }

    #[test]
    fn database_path_defaults_next_to_project() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::default();
        assert_eq!(
            config.database_path(dir.path()),
            dir.path().join("quillpress.db")
        );
    }

    #[test]
    fn write_default_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = AppConfig::write_default(dir.path()).unwrap();
        let loaded = AppConfig::load(dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(loaded, AppConfig::default());
    }
}

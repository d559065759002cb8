//! User configuration, read from `~/.config/spantag/config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use spantag_core::model::FALLBACK_COLOR;
use spantag_core::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Save the current document before moving to another one
    #[serde(default)]
    pub autosave: bool,
    /// Color for labels that match no project class
    #[serde(default = "default_fallback_color")]
    pub fallback_color: String,
    /// Project directory used when `--store` is not given
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autosave: false,
            fallback_color: default_fallback_color(),
            store_dir: None,
        }
    }
}

fn default_fallback_color() -> String {
    FALLBACK_COLOR.to_string()
}

impl Config {
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            autosave: self.autosave,
            fallback_color: self.fallback_color.clone(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spantag/config.toml"))
}

/// Load the user config; a missing file yields the defaults.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) => load_from(&path),
        None => Ok(Config::default()),
    }
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.session(), SessionConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "autosave = true\nstore_dir = \"/tmp/news\"\n").unwrap();

        let config = load_from(&path).unwrap();

        assert!(config.autosave);
        assert_eq!(config.fallback_color, FALLBACK_COLOR);
        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/news")));
    }

    #[test]
    fn test_invalid_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "autosave = \"sometimes\"").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}

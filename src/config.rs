use crate::feed;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "funcup";
pub const CONFIG_DIR_NAME: &str = ".funcup";
pub const CLI_DIR_NAME: &str = "cli";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub allow_prerelease: bool,
    #[serde(default)]
    pub install_root: Option<String>,
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
}

fn default_feed_url() -> String {
    feed::DEFAULT_FEED_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allow_prerelease: false,
            install_root: None,
            feed_url: default_feed_url(),
        }
    }
}

pub fn get_config_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("FUNCUP_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join(CONFIG_DIR_NAME);
    fs::create_dir_all(&dir)?;
    let path = dir.join(CONFIG_FILE_NAME);
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

/// Install root holding one directory per installed version.
pub fn install_root(settings: &Settings) -> Result<PathBuf> {
    if let Some(root) = &settings.install_root {
        return Ok(PathBuf::from(root));
    }
    let path = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
        .join(APP_NAME)
        .join(CLI_DIR_NAME);
    tracing::debug!("Install root: {}", path.display());
    Ok(path)
}

pub fn load_settings() -> Result<Settings> {
    let config_path = get_config_file_path()?;

    let mut settings = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read config file at {}", config_path.display()))?;
        serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")?
    } else {
        Settings::default()
    };

    // Apply environment variable overrides
    if let Ok(value) = std::env::var("FUNCUP_PRERELEASE") {
        settings.allow_prerelease = value.to_lowercase() == "true" || value == "1";
    }

    if let Ok(url) = std::env::var("FUNCUP_FEED_URL") {
        settings.feed_url = url;
    }

    if let Ok(root) = std::env::var("FUNCUP_ROOT") {
        settings.install_root = Some(root);
    }

    Ok(settings)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let config_path = get_config_file_path()?;
    let config_dir = config_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid config path"))?;

    fs::create_dir_all(config_dir)?;

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(&config_path, content)?;

    Ok(())
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}

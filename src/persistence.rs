use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::state::Settings;

const APP_DIR: &str = "ReadToMe";
const SETTINGS_FILE: &str = "settings.json";

/// `{config_dir}/ReadToMe/settings.json`
pub fn settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot find user configuration directory"))?;
    Ok(config_dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Reads settings, falling back to defaults when the file is missing or bad.
pub fn load_settings(path: &Path) -> Settings {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No stored settings found. Using defaults.");
            return Settings::default();
        }
        Err(e) => {
            tracing::warn!("Failed to read settings file {}: {}. Using defaults.", path.display(), e);
            return Settings::default();
        }
    };

    match serde_json::from_str::<Settings>(&data) {
        Ok(mut settings) => {
            settings.voice.sanitize();
            settings
        }
        Err(e) => {
            tracing::warn!("Failed to deserialize stored settings: {}. Using defaults.", e);
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .context("Failed to create settings directory")?;
    }
    let data = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, data)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;
    tracing::info!("Settings saved to {}", path.display());
    Ok(())
}

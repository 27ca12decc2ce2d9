use std::path::Path;
use anyhow::Result;

use crate::cli::{Overrides, SettingsAction};
use crate::persistence;
use crate::state::Settings;

pub fn handle(path: &Path, action: &SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = persistence::load_settings(path);
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Reset => {
            persistence::save_settings(path, &Settings::default())?;
            println!("Settings reset to defaults.");
        }
        SettingsAction::Set(overrides) => {
            let settings = update_settings(path, overrides)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

/// Applies `overrides` to the stored settings and writes them back.
pub fn update_settings(path: &Path, overrides: &Overrides) -> Result<Settings> {
    let mut settings = persistence::load_settings(path);
    overrides.apply(&mut settings);
    persistence::save_settings(path, &settings)?;
    Ok(settings)
}

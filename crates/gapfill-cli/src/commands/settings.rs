//! Settings command - show or initialize the settings file.

use std::path::Path;

use colored::Colorize;
use gapfill::Settings;

use super::common::{CommandResult, load_settings};

pub fn run(init: bool, force: bool, settings_path: Option<&Path>) -> CommandResult {
    if init {
        let path = match settings_path {
            Some(p) => p.to_path_buf(),
            None => Settings::default_path().ok_or("No home directory for settings")?,
        };
        if path.exists() && !force {
            return Err(format!(
                "Settings file already exists: {}\nUse --force to overwrite it.",
                path.display()
            )
            .into());
        }
        Settings::default().save_to(&path)?;
        println!("{} {}", "Wrote default settings to".green(), path.display());
        return Ok(());
    }

    let settings = load_settings(settings_path);
    let location = settings_path
        .map(Path::to_path_buf)
        .or_else(Settings::default_path);
    if let Some(path) = location {
        eprintln!("{} {}", "Settings from".dimmed(), path.display().to_string().dimmed());
    }
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

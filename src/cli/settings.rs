use colored::Colorize;

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path};

pub fn show() -> Result<()> {
    let settings = load_settings();
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let mut settings = load_settings();
    settings.set(key, value)?;
    save_settings(&settings)?;
    println!(
        "{} {key} = {value} in {}",
        "Saved".green(),
        settings_path().display()
    );
    Ok(())
}

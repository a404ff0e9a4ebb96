use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};
use crate::qif::{validate_date_format, DEFAULT_DATE_FORMAT};

/// How amounts are written in the vendor CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberLocale {
    pub decimal_separator: char,
    pub thousands_separator: Option<char>,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self {
            decimal_separator: ',',
            thousands_separator: Some('.'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: Option<char>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub allow_unknown_account: bool,
}

fn default_decimal_separator() -> char {
    NumberLocale::default().decimal_separator
}

fn default_thousands_separator() -> Option<char> {
    NumberLocale::default().thousands_separator
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            decimal_separator: default_decimal_separator(),
            thousands_separator: default_thousands_separator(),
            date_format: default_date_format(),
            allow_unknown_account: false,
        }
    }
}

impl Settings {
    pub fn number_locale(&self) -> NumberLocale {
        NumberLocale {
            decimal_separator: self.decimal_separator,
            thousands_separator: self.thousands_separator,
        }
    }

    /// Update one field from its command-line spelling.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "decimal_separator" => self.decimal_separator = parse_separator(value)?,
            "thousands_separator" => self.thousands_separator = parse_thousands_separator(value)?,
            "date_format" => {
                validate_date_format(value)?;
                self.date_format = value.to_string();
            }
            "allow_unknown_account" => {
                self.allow_unknown_account = value
                    .parse()
                    .map_err(|_| ConvertError::Settings(format!("expected true/false, got {value:?}")))?;
            }
            _ => return Err(ConvertError::Settings(format!("unknown setting: {key}"))),
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.thousands_separator == Some(self.decimal_separator) {
            return Err(ConvertError::Settings(
                "decimal and thousands separators must differ".into(),
            ));
        }
        Ok(())
    }
}

pub fn parse_separator(value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConvertError::Settings(format!(
            "separator must be a single character, got {value:?}"
        ))),
    }
}

/// `none` disables grouping.
pub fn parse_thousands_separator(value: &str) -> Result<Option<char>> {
    if value.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse_separator(value).map(Some)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("bank2qif")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings file {}: {e}", path.display());
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

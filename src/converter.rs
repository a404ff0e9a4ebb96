use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use crate::error::{ConvertError, Result};
use crate::iban::account_hint_from_filename;
use crate::importer::{get_by_key, sniff, ImporterKind, ParseOptions};
use crate::models::TransactionList;
use crate::qif::{write_qif, DEFAULT_DATE_FORMAT};
use crate::settings::{NumberLocale, Settings};

#[derive(Debug, Clone)]
pub struct ConvertOptions<'a> {
    pub account_hint: Option<&'a str>,
    /// Importer key that bypasses sniffing.
    pub format_key: Option<&'a str>,
    pub locale: NumberLocale,
    pub date_format: &'a str,
    pub allow_unknown_account: bool,
}

impl Default for ConvertOptions<'_> {
    fn default() -> Self {
        Self {
            account_hint: None,
            format_key: None,
            locale: NumberLocale::default(),
            date_format: DEFAULT_DATE_FORMAT,
            allow_unknown_account: false,
        }
    }
}

impl<'a> ConvertOptions<'a> {
    pub fn from_settings(settings: &'a Settings, account_hint: Option<&'a str>) -> Self {
        Self {
            account_hint,
            format_key: None,
            locale: settings.number_locale(),
            date_format: &settings.date_format,
            allow_unknown_account: settings.allow_unknown_account,
        }
    }
}

#[derive(Debug)]
pub struct ConvertResult {
    pub importer: ImporterKind,
    pub account_number: String,
    pub written: usize,
}

/// Explicit hint first, then an IBAN-looking file stem.
pub fn resolve_account_hint(explicit: Option<&str>, source_path: &Path) -> Option<String> {
    if let Some(hint) = explicit.map(str::trim).filter(|h| !h.is_empty()) {
        return Some(hint.to_string());
    }
    let from_filename = account_hint_from_filename(source_path);
    if let Some(number) = &from_filename {
        tracing::info!("Using {number} as account number (from filename)");
    }
    from_filename
}

fn write_target(list: &TransactionList, target_path: &Path, date_format: &str) -> Result<()> {
    let mut out = BufWriter::new(File::create(target_path)?);
    write_qif(list, &mut out, date_format)?;
    out.flush()?;
    Ok(())
}

fn remove_partial_target(target_path: &Path) {
    if let Err(e) = std::fs::remove_file(target_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove partial output {}: {e}", target_path.display());
        }
    }
}

/// Convert one bank export into a QIF file.
///
/// Nothing is created at `target_path` unless a parser accepted the whole
/// source. A failed write removes the partial target.
pub fn convert(
    source_path: &Path,
    target_path: &Path,
    options: &ConvertOptions,
) -> Result<ConvertResult> {
    let mut source = Cursor::new(std::fs::read(source_path)?);
    let importer = if let Some(key) = options.format_key {
        get_by_key(key).ok_or_else(|| ConvertError::UnknownFormat(key.to_string()))?
    } else {
        sniff(&mut source)?
            .ok_or_else(|| ConvertError::UnsupportedFormat(source_path.display().to_string()))?
    };
    tracing::debug!("Selected parser {} for {}", importer.name(), source_path.display());

    let hint = resolve_account_hint(options.account_hint, source_path);
    if importer.needs_account_hint() && hint.is_none() && !options.allow_unknown_account {
        return Err(ConvertError::MissingAccountName(
            source_path.display().to_string(),
        ));
    }

    let parse_options = ParseOptions {
        account_hint: hint.as_deref(),
        locale: options.locale,
    };
    let list = importer.parse(&mut source, &parse_options)?;

    if let Err(e) = write_target(&list, target_path, options.date_format) {
        remove_partial_target(target_path);
        return Err(e);
    }
    tracing::info!("Written to {}", target_path.display());

    Ok(ConvertResult {
        importer,
        account_number: list.account.account_number,
        written: list.transactions.len(),
    })
}

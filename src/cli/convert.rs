use std::path::{Path, PathBuf};

use colored::Colorize;

use super::FormatOverrides;
use crate::converter::{convert, ConvertOptions};
use crate::error::{ConvertError, Result};
use crate::qif::validate_date_format;
use crate::settings::{load_settings, parse_separator, parse_thousands_separator, Settings};

fn is_qif(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("qif"))
}

pub(crate) fn default_outfile(infile: &Path) -> PathBuf {
    infile.with_extension("qif")
}

/// Overrides are applied together so swapping both separators is accepted.
pub(crate) fn apply_overrides(settings: &mut Settings, overrides: &FormatOverrides) -> Result<()> {
    if let Some(sep) = &overrides.decimal_separator {
        settings.decimal_separator = parse_separator(sep)?;
    }
    if let Some(sep) = &overrides.thousands_separator {
        settings.thousands_separator = parse_thousands_separator(sep)?;
    }
    if let Some(fmt) = &overrides.date_format {
        validate_date_format(fmt)?;
        settings.date_format = fmt.clone();
    }
    settings.validate()
}

pub fn run(
    infile: &str,
    account_name: Option<&str>,
    outfile: Option<&str>,
    format: Option<&str>,
    overrides: &FormatOverrides,
) -> Result<()> {
    let source = PathBuf::from(infile);
    if is_qif(&source) {
        return Err(ConvertError::Settings(format!(
            "{} is already a QIF file",
            source.display()
        )));
    }
    let target = outfile
        .map(PathBuf::from)
        .unwrap_or_else(|| default_outfile(&source));

    let mut settings = load_settings();
    apply_overrides(&mut settings, overrides)?;
    let options = ConvertOptions {
        format_key: format,
        ..ConvertOptions::from_settings(&settings, account_name)
    };

    let result = convert(&source, &target, &options)?;
    println!(
        "{} {} transactions ({}, account {}) to {}",
        "Wrote".green(),
        result.written,
        result.importer.name(),
        result.account_number,
        target.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_outfile_replaces_extension() {
        assert_eq!(
            default_outfile(Path::new("/tmp/export.csv")),
            PathBuf::from("/tmp/export.qif")
        );
        assert_eq!(default_outfile(Path::new("statement")), PathBuf::from("statement.qif"));
    }

    #[test]
    fn test_qif_input_is_refused() {
        let err = run("/tmp/already.QIF", None, None, None, &FormatOverrides::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Settings(_)));
    }

    #[test]
    fn test_overrides_can_swap_separators() {
        let mut settings = Settings::default();
        let overrides = FormatOverrides {
            decimal_separator: Some(".".into()),
            thousands_separator: Some(",".into()),
            date_format: Some("%Y-%m-%d".into()),
        };
        apply_overrides(&mut settings, &overrides).unwrap();
        assert_eq!(settings.decimal_separator, '.');
        assert_eq!(settings.thousands_separator, Some(','));
        assert_eq!(settings.date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_overrides_reject_clash() {
        let mut settings = Settings::default();
        let overrides = FormatOverrides {
            decimal_separator: Some(".".into()),
            ..FormatOverrides::default()
        };
        assert!(apply_overrides(&mut settings, &overrides).is_err());
    }
}

mod bil;
mod ccp;
#[cfg(feature = "spreadsheet")]
mod spreadsheet;

use std::io::{Read, Seek, SeekFrom};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{ConvertError, Result};
use crate::models::TransactionList;
use crate::settings::NumberLocale;

/// Account number used for spreadsheet exports when nobody supplied one.
pub const UNKNOWN_ACCOUNT: &str = "unknown";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read the whole source from byte 0.
fn read_all<R: Read + Seek>(source: &mut R) -> Result<Vec<u8>> {
    source.seek(SeekFrom::Start(0))?;
    let mut data = Vec::new();
    source.read_to_end(&mut data)?;
    Ok(data)
}

/// Compare the first bytes of the source against a literal marker.
fn starts_with_magic<R: Read + Seek>(source: &mut R, magic: &[u8]) -> Result<bool> {
    source.seek(SeekFrom::Start(0))?;
    let mut head = vec![0u8; magic.len()];
    source.read_exact(&mut head)?;
    Ok(head == magic)
}

/// Decode text as UTF-8, falling back to Latin-1. Drops a leading BOM.
pub fn decode_text(data: &[u8]) -> String {
    let text = match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => data.iter().map(|&b| b as char).collect(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Split off `count` physical lines. Returns the lines (without line
/// terminators) and the remaining body.
fn split_header_lines(text: &str, count: usize) -> Result<(Vec<&str>, &str)> {
    let mut lines = Vec::with_capacity(count);
    let mut rest = text;
    for n in 1..=count {
        if rest.is_empty() {
            return Err(ConvertError::malformed(n as u64, "missing header line"));
        }
        let (line, tail) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };
        lines.push(line.trim_end_matches('\r'));
        rest = tail;
    }
    Ok((lines, rest))
}

fn semicolon_reader(body: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes())
}

/// Join only the fields which have a value.
pub fn clean_join(fields: &[&str]) -> String {
    fields
        .iter()
        .filter(|f| !f.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn parse_date(raw: &str, format: &str, line: u64) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), format)
        .map_err(|e| ConvertError::malformed(line, format!("invalid date {raw:?}: {e}")))
}

pub fn parse_decimal(raw: &str, line: u64) -> Result<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| ConvertError::malformed(line, format!("invalid amount {raw:?}: {e}")))
}

/// Normalize a locale-formatted amount (e.g. `-1.000,00`) before parsing.
pub fn parse_amount(raw: &str, locale: NumberLocale, line: u64) -> Result<Decimal> {
    let mut s: String = raw.trim().to_string();
    if let Some(sep) = locale.thousands_separator {
        s = s.replace(sep, "");
    }
    if locale.decimal_separator != '.' {
        s = s.replace(locale.decimal_separator, ".");
    }
    parse_decimal(&s, line).map_err(|_| {
        ConvertError::malformed(line, format!("invalid amount {raw:?}"))
    })
}

#[cfg(any(feature = "spreadsheet", test))]
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    if !serial.is_finite() {
        return None;
    }
    let days = chrono::TimeDelta::try_days(serial.trunc() as i64)?;
    base.checked_add_signed(days)
}

// ---------------------------------------------------------------------------
// Importer kinds
// ---------------------------------------------------------------------------

/// Per-call inputs a parser may need beyond the source bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions<'a> {
    pub account_hint: Option<&'a str>,
    pub locale: NumberLocale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImporterKind {
    Bil,
    CcpCsv,
    #[cfg(feature = "spreadsheet")]
    PrepaidCard,
    #[cfg(feature = "spreadsheet")]
    CcpSpreadsheet,
}

impl ImporterKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Bil => "bil",
            Self::CcpCsv => "ccp_csv",
            #[cfg(feature = "spreadsheet")]
            Self::PrepaidCard => "prepaid_card",
            #[cfg(feature = "spreadsheet")]
            Self::CcpSpreadsheet => "ccp_spreadsheet",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bil => "BILnet statement",
            Self::CcpCsv => "CCP account export (CSV)",
            #[cfg(feature = "spreadsheet")]
            Self::PrepaidCard => "Prepaid card export (spreadsheet)",
            #[cfg(feature = "spreadsheet")]
            Self::CcpSpreadsheet => "CCP account export (spreadsheet)",
        }
    }

    /// Whether the format carries no account number of its own.
    pub fn needs_account_hint(&self) -> bool {
        match self {
            Self::Bil | Self::CcpCsv => false,
            #[cfg(feature = "spreadsheet")]
            Self::PrepaidCard | Self::CcpSpreadsheet => true,
        }
    }

    /// Probe the source. May consume bytes; callers rewind afterwards.
    pub fn detect<R: Read + Seek + Clone>(&self, source: &mut R) -> Result<bool> {
        match self {
            Self::Bil => bil::detect(source),
            Self::CcpCsv => ccp::detect(source),
            #[cfg(feature = "spreadsheet")]
            Self::PrepaidCard => spreadsheet::detect_prepaid_card(source),
            #[cfg(feature = "spreadsheet")]
            Self::CcpSpreadsheet => spreadsheet::detect_ccp_spreadsheet(source),
        }
    }

    pub fn parse<R: Read + Seek + Clone>(
        &self,
        source: &mut R,
        options: &ParseOptions,
    ) -> Result<TransactionList> {
        match self {
            Self::Bil => bil::parse(source),
            Self::CcpCsv => ccp::parse(source, options),
            #[cfg(feature = "spreadsheet")]
            Self::PrepaidCard => spreadsheet::parse_prepaid_card(source, options),
            #[cfg(feature = "spreadsheet")]
            Self::CcpSpreadsheet => spreadsheet::parse_ccp_spreadsheet(source, options),
        }
    }
}

/// Probe order: byte markers first, spreadsheet probes last.
pub const ALL_IMPORTERS: &[ImporterKind] = &[
    ImporterKind::Bil,
    ImporterKind::CcpCsv,
    #[cfg(feature = "spreadsheet")]
    ImporterKind::PrepaidCard,
    #[cfg(feature = "spreadsheet")]
    ImporterKind::CcpSpreadsheet,
];

pub fn get_by_key(key: &str) -> Option<ImporterKind> {
    ALL_IMPORTERS.iter().find(|i| i.key() == key).copied()
}

/// Return the first importer whose probe accepts the source. Probe errors
/// count as "no match". The source is left at byte 0.
pub fn sniff<R: Read + Seek + Clone>(source: &mut R) -> Result<Option<ImporterKind>> {
    for importer in ALL_IMPORTERS {
        source.seek(SeekFrom::Start(0))?;
        let matched = match importer.detect(source) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!("Importer {} was unable to probe source: {e}", importer.key());
                false
            }
        };
        source.seek(SeekFrom::Start(0))?;
        if matched {
            tracing::debug!("Selected importer: {}", importer.key());
            return Ok(Some(*importer));
        }
    }
    Ok(None)
}

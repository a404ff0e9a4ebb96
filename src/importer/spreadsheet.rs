use std::io::{Read, Seek, SeekFrom};

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{
    clean_join, excel_serial_to_date, parse_date, parse_decimal, ParseOptions,
    UNKNOWN_ACCOUNT,
};
use crate::error::{ConvertError, Result};
use crate::models::{AccountInfo, QifTransaction, TransactionList};

const PREPAID_MARKER: &str = "Original amount";

// ---------------------------------------------------------------------------
// Cell decoding
// ---------------------------------------------------------------------------

fn first_sheet<R: Read + Seek + Clone>(source: &mut R) -> Result<Range<Data>> {
    source.seek(SeekFrom::Start(0))?;
    let mut workbook = open_workbook_auto_from_rs(source.clone())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ConvertError::malformed(1, "workbook has no sheets"))??;
    Ok(range)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn cell_date(cell: &Data, line: u64) -> Result<NaiveDate> {
    let serial = match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::DateTime(dt) => Some(dt.as_f64()),
        Data::String(s) => return parse_date(s, "%d/%m/%Y", line),
        Data::DateTimeIso(s) => {
            return parse_date(s.get(..10).unwrap_or(s.as_str()), "%Y-%m-%d", line)
        }
        _ => None,
    };
    serial
        .and_then(excel_serial_to_date)
        .ok_or_else(|| ConvertError::malformed(line, format!("invalid date cell {cell:?}")))
}

/// Amounts are cut to two decimals so float noise from the workbook never
/// reaches the output.
fn cell_amount(cell: &Data, line: u64) -> Result<Decimal> {
    match cell {
        Data::Float(f) => parse_decimal(&format!("{f:.2}"), line),
        Data::Int(i) => parse_decimal(&format!("{:.2}", *i as f64), line),
        Data::String(s) => parse_decimal(s, line),
        other => Err(ConvertError::malformed(
            line,
            format!("invalid amount cell {other:?}"),
        )),
    }
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|c| matches!(c, Data::Empty))
}

/// Data rows with their 1-based sheet row number. The header row and blank
/// rows are skipped.
fn data_rows<'a>(range: &'a Range<Data>) -> impl Iterator<Item = (u64, &'a [Data])> + 'a {
    range
        .rows()
        .enumerate()
        .skip(1)
        .filter(|(_, row)| !is_blank_row(row))
        .map(|(idx, row)| (idx as u64 + 1, row))
}

fn require_width(row: &[Data], width: usize, line: u64) -> Result<()> {
    if row.len() < width {
        return Err(ConvertError::malformed(
            line,
            format!("expected {width} columns, found {}", row.len()),
        ));
    }
    Ok(())
}

fn account_for(options: &ParseOptions) -> AccountInfo {
    AccountInfo::new(options.account_hint.unwrap_or(UNKNOWN_ACCOUNT), "")
}

// ---------------------------------------------------------------------------
// Prepaid card export
// ---------------------------------------------------------------------------

/// `[accounting_date, operation_date, card_number, description,
/// original_amount, amount_in_reporting_currency]`
struct PrepaidCardRow<'a> {
    accounting_date: &'a Data,
    description: &'a Data,
    amount: &'a Data,
}

impl<'a> PrepaidCardRow<'a> {
    const WIDTH: usize = 6;

    fn from_row(row: &'a [Data], line: u64) -> Result<Self> {
        require_width(row, Self::WIDTH, line)?;
        Ok(Self {
            accounting_date: &row[0],
            description: &row[3],
            amount: &row[5],
        })
    }

    fn to_qif(&self, line: u64) -> Result<QifTransaction> {
        Ok(QifTransaction {
            date: cell_date(self.accounting_date, line)?,
            value: cell_amount(self.amount, line)?,
            message: cell_text(self.description),
            counterparty: String::new(),
            reference: String::new(),
        })
    }
}

pub(super) fn detect_prepaid_card<R: Read + Seek + Clone>(source: &mut R) -> Result<bool> {
    let range = first_sheet(source)?;
    let Some(header) = range.rows().next() else {
        return Ok(false);
    };
    Ok(header.len() == PrepaidCardRow::WIDTH && cell_text(&header[4]) == PREPAID_MARKER)
}

pub(super) fn parse_prepaid_card<R: Read + Seek + Clone>(
    source: &mut R,
    options: &ParseOptions,
) -> Result<TransactionList> {
    let range = first_sheet(source)?;
    let mut transactions = Vec::new();
    for (line, row) in data_rows(&range) {
        transactions.push(PrepaidCardRow::from_row(row, line)?.to_qif(line)?);
    }
    Ok(TransactionList {
        account: account_for(options),
        transactions,
    })
}

// ---------------------------------------------------------------------------
// CCP account export (spreadsheet)
// ---------------------------------------------------------------------------

/// `[accounting_date, description, counterparty_account, counterparty_name, amount]`
struct CcpSheetRow<'a> {
    accounting_date: &'a Data,
    description: &'a Data,
    counterparty_account: &'a Data,
    counterparty_name: &'a Data,
    amount: &'a Data,
}

impl<'a> CcpSheetRow<'a> {
    const WIDTH: usize = 5;

    fn from_row(row: &'a [Data], line: u64) -> Result<Self> {
        require_width(row, Self::WIDTH, line)?;
        Ok(Self {
            accounting_date: &row[0],
            description: &row[1],
            counterparty_account: &row[2],
            counterparty_name: &row[3],
            amount: &row[4],
        })
    }

    fn to_qif(&self, line: u64) -> Result<QifTransaction> {
        let account = cell_text(self.counterparty_account);
        let name = cell_text(self.counterparty_name);
        Ok(QifTransaction {
            date: cell_date(self.accounting_date, line)?,
            value: cell_amount(self.amount, line)?,
            message: cell_text(self.description),
            counterparty: clean_join(&[&account, &name]),
            reference: String::new(),
        })
    }
}

pub(super) fn detect_ccp_spreadsheet<R: Read + Seek + Clone>(source: &mut R) -> Result<bool> {
    let range = first_sheet(source)?;
    Ok(range
        .rows()
        .next()
        .is_some_and(|header| header.len() == CcpSheetRow::WIDTH))
}

pub(super) fn parse_ccp_spreadsheet<R: Read + Seek + Clone>(
    source: &mut R,
    options: &ParseOptions,
) -> Result<TransactionList> {
    let range = first_sheet(source)?;
    let mut transactions = Vec::new();
    for (line, row) in data_rows(&range) {
        transactions.push(CcpSheetRow::from_row(row, line)?.to_qif(line)?);
    }
    Ok(TransactionList {
        account: account_for(options),
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::importer::tests::fixture;
    use crate::importer::{sniff, ImporterKind};
    use crate::qif::write_qif;

    fn options(hint: Option<&str>) -> ParseOptions<'_> {
        ParseOptions {
            account_hint: hint,
            ..ParseOptions::default()
        }
    }

    #[test]
    fn test_cell_amount_rounds_to_cents() {
        assert_eq!(cell_amount(&Data::Float(20.099999999999998), 2).unwrap().to_string(), "20.10");
        assert_eq!(cell_amount(&Data::Float(-16.7), 2).unwrap().to_string(), "-16.70");
        assert_eq!(cell_amount(&Data::Int(500), 2).unwrap().to_string(), "500.00");
        assert!(cell_amount(&Data::Empty, 2).is_err());
    }

    #[test]
    fn test_cell_date() {
        assert_eq!(
            cell_date(&Data::Float(43168.0), 2).unwrap(),
            NaiveDate::from_ymd_opt(2018, 3, 9).unwrap()
        );
        assert_eq!(
            cell_date(&Data::String("09/03/2018".into()), 2).unwrap(),
            NaiveDate::from_ymd_opt(2018, 3, 9).unwrap()
        );
        assert!(matches!(
            cell_date(&Data::Float(1e300), 2),
            Err(ConvertError::MalformedInput { line: 2, .. })
        ));
        assert!(matches!(
            cell_date(&Data::Bool(true), 4),
            Err(ConvertError::MalformedInput { line: 4, .. })
        ));
    }

    #[test]
    fn test_sniff_prepaid_card() {
        let mut source = Cursor::new(fixture("spreadsheet/prepaid_card.xlsx"));
        assert_eq!(sniff(&mut source).unwrap(), Some(ImporterKind::PrepaidCard));
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn test_sniff_ccp_spreadsheet() {
        let mut source = Cursor::new(fixture("spreadsheet/ccp_export.xlsx"));
        assert_eq!(sniff(&mut source).unwrap(), Some(ImporterKind::CcpSpreadsheet));
    }

    #[test]
    fn test_parse_prepaid_card() {
        let mut source = Cursor::new(fixture("spreadsheet/prepaid_card.xlsx"));
        let list = parse_prepaid_card(&mut source, &options(None)).unwrap();
        assert_eq!(list.account, AccountInfo::new(UNKNOWN_ACCOUNT, ""));
        assert_eq!(list.transactions.len(), 3);
        let first = &list.transactions[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2018, 3, 9).unwrap());
        assert_eq!(first.message, "GROCERY STORE");
        assert_eq!(first.value.to_string(), "-54.42");
        assert!(first.counterparty.is_empty());
        assert!(first.reference.is_empty());
    }

    #[test]
    fn test_prepaid_card_matches_golden_file() {
        let mut source = Cursor::new(fixture("spreadsheet/prepaid_card.xlsx"));
        let list = parse_prepaid_card(&mut source, &options(Some("prepaid-card"))).unwrap();
        let mut out = Vec::new();
        write_qif(&list, &mut out, "%d/%m/%Y").unwrap();
        let expected = String::from_utf8(fixture("spreadsheet/prepaid_card.qif")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_ccp_spreadsheet_matches_golden_file() {
        let mut source = Cursor::new(fixture("spreadsheet/ccp_export.xlsx"));
        let list =
            parse_ccp_spreadsheet(&mut source, &options(Some("LU28 0019 4006 4475 0000"))).unwrap();
        assert_eq!(list.transactions.len(), 3);
        assert_eq!(list.transactions[1].value.to_string(), "20.10");
        assert_eq!(list.transactions[2].counterparty, "Landlord S.A.");
        let mut out = Vec::new();
        write_qif(&list, &mut out, "%d/%m/%Y").unwrap();
        let expected = String::from_utf8(fixture("spreadsheet/ccp_export.qif")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_text_source_is_not_a_workbook() {
        let mut source = Cursor::new(b"plain text, nothing else".to_vec());
        assert!(detect_prepaid_card(&mut source).is_err());
        assert!(detect_ccp_spreadsheet(&mut source).is_err());
    }
}

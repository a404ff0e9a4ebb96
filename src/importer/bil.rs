use std::io::{Read, Seek};

use super::{
    decode_text, parse_date, parse_decimal, read_all, semicolon_reader, split_header_lines,
    starts_with_magic,
};
use crate::error::{ConvertError, Result};
use crate::models::{AccountInfo, QifTransaction, TransactionList};

const MAGIC: &[u8] = b"BILnet";
const HEADER_LINES: usize = 5;
const ACCOUNT_LINE: usize = 2;
const DATE_FORMAT: &str = "%d/%m/%Y";

/// One data row of a BILnet statement, by position.
struct BilRow<'a> {
    value_date: &'a str,
    label: &'a str,
    message: &'a str,
    value: &'a str,
}

impl<'a> BilRow<'a> {
    fn from_record(record: &'a csv::StringRecord, line: u64) -> Result<Self> {
        if record.len() != 6 {
            return Err(ConvertError::malformed(
                line,
                format!("expected 6 fields, found {}", record.len()),
            ));
        }
        Ok(Self {
            value_date: &record[1],
            label: &record[2],
            message: &record[3],
            value: &record[4],
        })
    }

    fn to_qif(&self, line: u64) -> Result<QifTransaction> {
        Ok(QifTransaction {
            date: parse_date(self.value_date, DATE_FORMAT, line)?,
            value: parse_decimal(self.value, line)?,
            message: format!("{} | {}", self.label, self.message),
            counterparty: String::new(),
            reference: String::new(),
        })
    }
}

pub(super) fn detect<R: Read + Seek>(source: &mut R) -> Result<bool> {
    starts_with_magic(source, MAGIC)
}

/// `<account_number> <description>`; the description may be quoted.
fn parse_account_line(line: &str) -> AccountInfo {
    let line = line.trim();
    let (number, description) = line.split_once(' ').unwrap_or((line, ""));
    let description = description.trim_matches(|c: char| matches!(c, '\r' | '\n' | '\t' | ' ' | '"'));
    AccountInfo::new(number, description)
}

pub(super) fn parse<R: Read + Seek>(source: &mut R) -> Result<TransactionList> {
    let text = decode_text(&read_all(source)?);
    let (header, body) = split_header_lines(&text, HEADER_LINES)?;
    if !header[0].starts_with("BILnet") {
        return Err(ConvertError::malformed(1, "missing BILnet marker"));
    }
    let account = parse_account_line(header[ACCOUNT_LINE]);

    let mut transactions = Vec::new();
    let mut rdr = semicolon_reader(body);
    for result in rdr.records() {
        let record = result?;
        let line = HEADER_LINES as u64 + record.position().map_or(0, |p| p.line());
        let row = BilRow::from_record(&record, line)?;
        transactions.push(row.to_qif(line)?);
    }
    tracing::debug!(
        "Parsed {} BILnet transactions for {}",
        transactions.len(),
        account.account_number
    );
    Ok(TransactionList {
        account,
        transactions,
    })
}

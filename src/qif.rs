use std::io::Write;

use chrono::format::{Item, StrftimeItems};

use crate::error::{ConvertError, Result};
use crate::models::TransactionList;

pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Serialize a transaction list as a QIF bank register.
///
/// Field values are written verbatim. A memo containing a line made of a
/// single `^` will corrupt the record structure.
pub fn write_qif<W: Write>(list: &TransactionList, out: &mut W, date_format: &str) -> Result<()> {
    writeln!(out, "!Account")?;
    writeln!(out, "N{}", list.account.account_number)?;
    writeln!(out, "D\"{}\"", list.account.description)?;
    writeln!(out, "TBank")?;
    writeln!(out, "^")?;
    writeln!(out, "!Type:Bank")?;
    for txn in &list.transactions {
        tracing::trace!("Writing transaction at {}", txn.date);
        writeln!(out, "D{}", txn.date.format(date_format))?;
        writeln!(out, "T{}", txn.value)?;
        writeln!(out, "M{}", txn.message)?;
        if !txn.counterparty.is_empty() {
            writeln!(out, "P{}", txn.counterparty)?;
        }
        if !txn.reference.is_empty() {
            writeln!(out, "N{}", txn.reference)?;
        }
        writeln!(out, "^")?;
    }
    Ok(())
}

pub fn validate_date_format(date_format: &str) -> Result<()> {
    if date_format.is_empty() || StrftimeItems::new(date_format).any(|i| matches!(i, Item::Error)) {
        return Err(ConvertError::Settings(format!("invalid date format: {date_format:?}")));
    }
    Ok(())
}

/// The bare account header, as prepended by `augment`.
pub fn account_header(account_number: &str) -> String {
    format!("!Account\nN{account_number}\nTBank\n^\n")
}

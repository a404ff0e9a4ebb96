use std::io::{Read, Seek};

use super::{
    clean_join, decode_text, parse_amount, parse_date, read_all, semicolon_reader,
    split_header_lines, starts_with_magic, ParseOptions,
};
use crate::error::{ConvertError, Result};
use crate::iban::validate_and_format;
use crate::models::{AccountInfo, QifTransaction, TransactionList};
use crate::settings::NumberLocale;

const MAGIC: &[u8] = b"Account number :;";
const HEADER_LINES: usize = 2;
const MIN_FIELDS: usize = 10;
const DATE_FORMAT: &str = "%d-%m-%Y";

/// One data row of a CCP account export, by position.
struct CcpRow<'a> {
    description: &'a str,
    amount: &'a str,
    value_date: &'a str,
    counterparty_account: &'a str,
    counterparty_name: &'a str,
    communication_1: &'a str,
    communication_2: &'a str,
    operation_reference: &'a str,
}

impl<'a> CcpRow<'a> {
    fn from_record(record: &'a csv::StringRecord, line: u64) -> Result<Self> {
        if record.len() < MIN_FIELDS {
            return Err(ConvertError::malformed(
                line,
                format!("expected at least {MIN_FIELDS} fields, found {}", record.len()),
            ));
        }
        Ok(Self {
            description: &record[1],
            amount: &record[2],
            value_date: &record[4],
            counterparty_account: &record[5],
            counterparty_name: &record[6],
            communication_1: &record[7],
            communication_2: &record[8],
            operation_reference: &record[9],
        })
    }

    fn to_qif(&self, locale: NumberLocale, line: u64) -> Result<QifTransaction> {
        Ok(QifTransaction {
            date: parse_date(self.value_date, DATE_FORMAT, line)?,
            value: parse_amount(self.amount, locale, line)?,
            message: clean_join(&[self.description, self.communication_1, self.communication_2]),
            counterparty: clean_join(&[self.counterparty_account, self.counterparty_name]),
            reference: self.operation_reference.to_string(),
        })
    }
}

pub(super) fn detect<R: Read + Seek>(source: &mut R) -> Result<bool> {
    starts_with_magic(source, MAGIC)
}

/// Pull the account number out of `Account number :;<number>;`. Valid IBANs
/// are returned in print format, anything else verbatim.
pub fn account_number_from_line(line: &str) -> Option<String> {
    let raw = line.split(';').nth(1)?.trim();
    if raw.is_empty() {
        return None;
    }
    match validate_and_format(raw) {
        Ok(formatted) => Some(formatted),
        Err(_) => Some(raw.to_string()),
    }
}

pub(super) fn parse<R: Read + Seek>(source: &mut R, options: &ParseOptions) -> Result<TransactionList> {
    let text = decode_text(&read_all(source)?);
    // Account line, then the column header.
    let (header, body) = split_header_lines(&text, HEADER_LINES)?;
    let account_number = match account_number_from_line(header[0]) {
        Some(number) => {
            if let Some(hint) = options.account_hint.filter(|h| *h != number) {
                tracing::info!("Account number {number:?} found in file. Overriding {hint:?}");
            }
            number
        }
        None => options.account_hint.unwrap_or_default().to_string(),
    };

    let mut transactions = Vec::new();
    let mut rdr = semicolon_reader(body);
    for result in rdr.records() {
        let record = result?;
        let line = HEADER_LINES as u64 + record.position().map_or(0, |p| p.line());
        let row = CcpRow::from_record(&record, line)?;
        transactions.push(row.to_qif(options.locale, line)?);
    }
    tracing::debug!("Parsed {} CCP transactions for {account_number}", transactions.len());
    Ok(TransactionList {
        account: AccountInfo::new(account_number, ""),
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::importer::tests::fixture;
    use crate::qif::write_qif;

    const HEADER: &str = "Accounting date;Description;Amount;Currency;Value date;Counterparty account;Counterparty name;Communication 1;Communication 2;Operation reference\n";

    fn parse_str(content: &str, hint: Option<&str>) -> Result<TransactionList> {
        let options = ParseOptions {
            account_hint: hint,
            locale: NumberLocale::default(),
        };
        parse(&mut Cursor::new(content.as_bytes().to_vec()), &options)
    }

    #[test]
    fn test_parse_fixture() {
        let list = parse(&mut Cursor::new(fixture("ccp/ccp_in.csv")), &ParseOptions::default()).unwrap();
        assert_eq!(list.account, AccountInfo::new("LU12 3456 7890 1234 5678", ""));
        assert_eq!(list.transactions.len(), 6);
        assert_eq!(
            list.transactions[0],
            QifTransaction {
                date: NaiveDate::from_ymd_opt(2017, 1, 2).unwrap(),
                value: "-16.70".parse::<Decimal>().unwrap(),
                message: "description 1 | comm 1-1 | comm 1-2".to_string(),
                counterparty: "LU23 4567 8901 2345 1234".to_string(),
                reference: "ref 1".to_string(),
            }
        );
        let last = &list.transactions[5];
        assert_eq!(last.value, Decimal::new(-100000, 2));
        assert_eq!(last.message, "description 6 | rent; january");
        assert_eq!(last.counterparty, "Landlord S.A.");
        assert_eq!(last.reference, "");
    }

    #[test]
    fn test_fixture_to_qif_matches_golden_file() {
        let list = parse(&mut Cursor::new(fixture("ccp/ccp_in.csv")), &ParseOptions::default()).unwrap();
        let mut out = Vec::new();
        write_qif(&list, &mut out, "%d/%m/%Y").unwrap();
        let expected = String::from_utf8(fixture("ccp/ccp_out.qif")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_account_in_file_overrides_hint() {
        let content = format!(
            "Account number :;LU280019400644750000;\n{HEADER}01-02-2019;d;-1,00;EUR;01-02-2019;;;;;\n"
        );
        let list = parse_str(&content, Some("FOO")).unwrap();
        assert_eq!(list.account.account_number, "LU28 0019 4006 4475 0000");
    }

    #[test]
    fn test_empty_account_falls_back_to_hint() {
        let content = format!("Account number :;;\n{HEADER}");
        let list = parse_str(&content, Some("FOO")).unwrap();
        assert_eq!(list.account.account_number, "FOO");
        let list = parse_str(&content, None).unwrap();
        assert_eq!(list.account.account_number, "");
    }

    #[test]
    fn test_narrow_header_keeps_every_data_row() {
        let content = "Account number :;LU12;\n\
                       Date;Description;Amount;Currency;Value date;Account;Name;Reference\n\
                       01-02-2019;first;-1.000,00;EUR;03-02-2019;;;;;\n\
                       02-02-2019;second;2,50;EUR;04-02-2019;;;;;\n";
        let list = parse_str(content, None).unwrap();
        let messages: Vec<&str> = list.transactions.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(list.transactions[0].date, NaiveDate::from_ymd_opt(2019, 2, 3).unwrap());
        assert_eq!(list.transactions[0].value.to_string(), "-1000.00");
        assert_eq!(list.transactions[0].counterparty, "");
    }

    #[test]
    fn test_missing_column_header_is_malformed() {
        let err = parse_str("Account number :;LU12;\n", None).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let content = format!("Account number :;LU12;\n{HEADER}01-02-2019;d;-1,00;EUR\n");
        let err = parse_str(&content, None).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedInput { line: 3, .. }));
    }

    #[test]
    fn test_bad_amount_is_malformed() {
        let content = format!("Account number :;LU12;\n{HEADER}01-02-2019;d;n/a;EUR;01-02-2019;;;;;\n");
        assert!(matches!(
            parse_str(&content, None).unwrap_err(),
            ConvertError::MalformedInput { line: 3, .. }
        ));
    }

    #[test]
    fn test_account_number_from_line() {
        assert_eq!(
            account_number_from_line("Account number :;LU280019400644750000;"),
            Some("LU28 0019 4006 4475 0000".to_string())
        );
        assert_eq!(
            account_number_from_line("Account number :; LU12 3456 ;"),
            Some("LU12 3456".to_string())
        );
        assert_eq!(account_number_from_line("Account number :;"), None);
        assert_eq!(account_number_from_line("no separator"), None);
    }

    #[test]
    fn test_detect() {
        assert!(detect(&mut Cursor::new(fixture("ccp/ccp_in.csv"))).unwrap());
        assert!(!detect(&mut Cursor::new(b"Account number : LU12 3456 7890".to_vec())).unwrap());
    }
}

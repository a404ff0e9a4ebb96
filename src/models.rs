use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Identifies the bank account a statement belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: String,
    pub description: String,
}

impl AccountInfo {
    pub fn new(account_number: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            account_number: account_number.into(),
            description: description.into(),
        }
    }
}

/// One ledger entry, normalized from a source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QifTransaction {
    pub date: NaiveDate,
    pub value: Decimal,
    pub message: String,
    pub counterparty: String,
    pub reference: String,
}

/// Result of parsing one input file. Transactions keep source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionList {
    pub account: AccountInfo,
    pub transactions: Vec<QifTransaction>,
}

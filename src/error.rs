use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "spreadsheet")]
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No parser found for {0}")]
    UnsupportedFormat(String),

    #[error("Unknown format key: {0}")]
    UnknownFormat(String),

    #[error("Malformed input at line {line}: {reason}")]
    MalformedInput { line: u64, reason: String },

    #[error("Account name is required for spreadsheet exports ({0}). Pass one with --account-name")]
    MissingAccountName(String),

    #[error("Invalid IBAN: {0}")]
    InvalidIban(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl ConvertError {
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

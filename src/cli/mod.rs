pub mod augment;
pub mod convert;
pub mod settings;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bank2qif",
    version,
    about = "Convert bank account exports into QIF files."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a bank export (BIL, CCP CSV, XLS/XLSX) into a QIF file.
    Convert {
        /// Path to the exported file
        infile: String,
        /// Account number for formats that do not carry one
        #[arg(short = 'n', long = "account-name")]
        account_name: Option<String>,
        /// Output path (default: <infile stem>.qif next to the input)
        #[arg(short = 'o', long)]
        outfile: Option<String>,
        /// Importer format key (bil, ccp_csv, prepaid_card, ccp_spreadsheet); sniffed when omitted
        #[arg(short = 'f', long)]
        format: Option<String>,
        #[command(flatten)]
        overrides: FormatOverrides,
    },
    /// Prepend a missing account header to every QIF file in a folder.
    Augment {
        /// Folder holding the QIF files and hints.json
        folder: String,
    },
    /// Show or change persistent settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

/// Per-invocation overrides of the stored settings.
#[derive(Args, Default)]
pub struct FormatOverrides {
    /// Decimal separator used in CSV amounts
    #[arg(long = "decimal-separator")]
    pub decimal_separator: Option<String>,
    /// Thousands separator used in CSV amounts ('none' disables)
    #[arg(long = "thousands-separator")]
    pub thousands_separator: Option<String>,
    /// Output date format (strftime syntax, e.g. %d/%m/%Y)
    #[arg(long = "date-format")]
    pub date_format: Option<String>,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the effective settings as JSON.
    Show,
    /// Persist one setting.
    Set {
        /// decimal_separator, thousands_separator, date_format or allow_unknown_account
        key: String,
        value: String,
    },
}

mod augment;
mod cli;
mod converter;
mod error;
mod iban;
mod importer;
mod models;
mod qif;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, SettingsCommands};

fn init_logging() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {e}");
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            infile,
            account_name,
            outfile,
            format,
            overrides,
        } => cli::convert::run(
            &infile,
            account_name.as_deref(),
            outfile.as_deref(),
            format.as_deref(),
            &overrides,
        ),
        Commands::Augment { folder } => cli::augment::run(&folder),
        Commands::Settings { command } => match command {
            SettingsCommands::Show => cli::settings::show(),
            SettingsCommands::Set { key, value } => cli::settings::set(&key, &value),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

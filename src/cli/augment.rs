use std::path::Path;

use colored::Colorize;
use dialoguer::Input;

use crate::augment::process_folder;
use crate::error::{ConvertError, Result};

fn ask_account_number(path: &Path, guess: Option<&str>) -> Result<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let mut input = Input::<String>::new()
        .with_prompt(format!("Account number for {name}"))
        .allow_empty(true);
    if let Some(guess) = guess {
        input = input.default(guess.to_string());
    }
    input
        .interact_text()
        .map_err(|e| ConvertError::Prompt(e.to_string()))
}

pub fn run(folder: &str) -> Result<()> {
    let folder = Path::new(folder);
    if !folder.is_dir() {
        return Err(ConvertError::Settings(format!(
            "{} is not a directory",
            folder.display()
        )));
    }

    let result = process_folder(folder, &mut ask_account_number)?;
    if result.tagged == 0 {
        println!("{}", "Nothing to do, every QIF file has an account.".green());
    } else {
        println!(
            "{} {} file(s), {} already had an account",
            "Tagged".green(),
            result.tagged,
            result.skipped
        );
    }
    Ok(())
}

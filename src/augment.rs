//! Backfill a missing `!Account` header into existing QIF files.
//!
//! Account numbers are guessed from a `hints.json` file living next to the
//! QIF files. It maps each account number to filename fragments:
//!
//! ```json
//! { "LU28 0019 4006 4475 0000": ["checking", "LU28-2018-03.qif"] }
//! ```
//!
//! Every file that gets tagged adds its own name to the hint list of the
//! confirmed account, so the next batch needs less typing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};
use crate::qif::account_header;

pub const HINTS_FILE: &str = "hints.json";

pub type Hints = BTreeMap<String, Vec<String>>;

pub fn load_hints(path: &Path) -> Result<Hints> {
    if !path.exists() {
        return Ok(Hints::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_hints(path: &Path, hints: &Hints) -> Result<()> {
    let json = serde_json::to_string_pretty(hints)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn has_account_header(content: &str) -> bool {
    content.lines().any(|l| l.trim().starts_with("!Account"))
}

/// First account with a hint contained in the path (case-insensitive).
pub fn guess_account<'a>(hints: &'a Hints, path: &Path) -> Option<&'a str> {
    let haystack = path.to_string_lossy().to_lowercase();
    hints
        .iter()
        .find(|(_, fragments)| {
            fragments
                .iter()
                .any(|f| !f.is_empty() && haystack.contains(&f.to_lowercase()))
        })
        .map(|(account, _)| account.as_str())
}

#[derive(Debug, PartialEq, Eq)]
pub enum FileOutcome {
    AlreadyTagged,
    Tagged(String),
}

/// Tag one file. `prompt` receives the guessed account (if any) and returns
/// the user's answer; an empty answer accepts the guess.
pub fn process_file(
    path: &Path,
    hints: &mut Hints,
    prompt: &mut dyn FnMut(&Path, Option<&str>) -> Result<String>,
) -> Result<FileOutcome> {
    let data = std::fs::read_to_string(path)?;
    if has_account_header(&data) {
        tracing::debug!("{} already contains an account identifier", path.display());
        return Ok(FileOutcome::AlreadyTagged);
    }

    let guessed = guess_account(hints, path).map(str::to_string);
    let answer = prompt(path, guessed.as_deref())?;
    let account_number = match (answer.trim(), guessed) {
        ("", Some(guess)) => guess,
        ("", None) => {
            return Err(ConvertError::Prompt(format!(
                "Must have an account number for {}",
                path.display()
            )))
        }
        (typed, _) => typed.to_string(),
    };

    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        let fragments = hints.entry(account_number.clone()).or_default();
        if !fragments.iter().any(|f| f == name) {
            fragments.push(name.to_string());
            fragments.sort();
        }
    }

    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    std::fs::rename(path, &backup)?;
    std::fs::write(path, format!("{}{data}", account_header(&account_number)))?;
    Ok(FileOutcome::Tagged(account_number))
}

pub fn qif_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("qif"))
        })
        .collect();
    files.sort();
    Ok(files)
}

pub struct AugmentResult {
    pub tagged: usize,
    pub skipped: usize,
}

/// Process every QIF file in `folder`. Hints are loaded once and saved once,
/// also when a file fails midway.
pub fn process_folder(
    folder: &Path,
    prompt: &mut dyn FnMut(&Path, Option<&str>) -> Result<String>,
) -> Result<AugmentResult> {
    let hints_path = folder.join(HINTS_FILE);
    let mut hints = load_hints(&hints_path)?;
    let mut result = AugmentResult {
        tagged: 0,
        skipped: 0,
    };

    let mut outcome = Ok(());
    for file in qif_files(folder)? {
        match process_file(&file, &mut hints, prompt) {
            Ok(FileOutcome::Tagged(_)) => result.tagged += 1,
            Ok(FileOutcome::AlreadyTagged) => result.skipped += 1,
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    save_hints(&hints_path, &hints)?;
    outcome.map(|()| result)
}

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ConvertError, Result};

fn iban_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{11,30}$").expect("static regex"))
}

/// ISO 13616 check: move the first four characters to the end, map letters
/// to 10..35 and verify the number is 1 mod 97.
fn checksum_ok(compact: &str) -> bool {
    let (head, tail) = compact.split_at(4);
    let mut remainder: u32 = 0;
    for c in tail.chars().chain(head.chars()) {
        let Some(value) = c.to_digit(36) else {
            return false;
        };
        remainder = if value < 10 {
            (remainder * 10 + value) % 97
        } else {
            (remainder * 100 + value) % 97
        };
    }
    remainder == 1
}

/// Validate an IBAN and return it in print format (groups of four).
pub fn validate_and_format(raw: &str) -> Result<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if !iban_shape().is_match(&compact) || !checksum_ok(&compact) {
        return Err(ConvertError::InvalidIban(raw.trim().to_string()));
    }
    let groups: Vec<String> = compact
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    Ok(groups.join(" "))
}

/// Treat the file stem as an account number if it is a valid IBAN.
pub fn account_hint_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    validate_and_format(stem).ok()
}

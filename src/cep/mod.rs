//! Postal code (CEP) model and extraction
//!
//! A CEP is stored in its normalized 8-digit form; the hyphenated
//! `NNNNN-NNN` form is derived on demand. Equality, hashing and ordering
//! all work on the normalized digits, which sort identically to the
//! canonical form because the hyphen sits at a fixed position.

mod extractor;

pub use extractor::{extract_candidates, extract_record_code, is_valid};

use std::fmt;
use std::str::FromStr;

/// A normalized Brazilian postal code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostalCode {
    digits: String,
}

impl PostalCode {
    /// Builds a postal code from either `NNNNNNNN` or `NNNNN-NNN`
    ///
    /// Surrounding whitespace is ignored. Returns `None` for anything that
    /// does not normalize to exactly 8 ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let digits: String = match raw.len() {
            8 => raw.to_string(),
            9 if raw.as_bytes()[5] == b'-' => raw.replacen('-', "", 1),
            _ => return None,
        };

        if digits.len() == 8 && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self { digits })
        } else {
            None
        }
    }

    /// The 8-digit form without hyphen (the CSV representation)
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// The canonical display form `NNNNN-NNN`
    pub fn canonical(&self) -> String {
        format!("{}-{}", &self.digits[..5], &self.digits[5..])
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", &self.digits[..5], &self.digits[5..])
    }
}

/// Error returned when a string is not a postal code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a postal code: '{0}'")]
pub struct InvalidPostalCode(pub String);

impl FromStr for PostalCode {
    type Err = InvalidPostalCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidPostalCode(s.to_string()))
    }
}

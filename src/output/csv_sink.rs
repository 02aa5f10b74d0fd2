//! CSV handoff file
//!
//! The crawl's only artifact is a single-column CSV: header `cep`, one
//! 8-digit code per row, sorted ascending. The queue publisher downstream
//! reads that column back, so this module also carries the reader used to
//! validate a file before handing it off.

use crate::cep::PostalCode;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the only column
pub const CEP_COLUMN: &str = "cep";

/// Errors that can occur while writing or reading the CSV
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("CSV file must contain a 'cep' column")]
    MissingColumn,

    #[error("CSV file has no rows")]
    Empty,
}

/// Result type for CSV operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Writes codes to `path` as a sorted single-column CSV
///
/// Rows hold the 8-digit form without hyphen. Parent directories are
/// created as needed and an existing file is replaced. Returns the number
/// of rows written.
///
/// # Example
///
/// ```no_run
/// use cep_harvest::cep::PostalCode;
/// use cep_harvest::output::write_postal_codes;
/// use std::path::Path;
///
/// let codes = vec![PostalCode::parse("01310-100").unwrap()];
/// write_postal_codes(&codes, Path::new("data/ceps.csv")).unwrap();
/// ```
pub fn write_postal_codes<'a, I>(items: I, path: &Path) -> SinkResult<usize>
where
    I: IntoIterator<Item = &'a PostalCode>,
{
    let mut rows: Vec<&str> = items.into_iter().map(PostalCode::digits).collect();
    rows.sort_unstable();
    rows.dedup();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([CEP_COLUMN])?;
    for digits in &rows {
        writer.write_record([*digits])?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} code(s) to {}", rows.len(), path.display());
    Ok(rows.len())
}

/// Contents of a handoff CSV, split by validity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvCheck {
    /// Valid codes, deduplicated, in first-seen order
    pub valid: Vec<PostalCode>,

    /// Raw values that are not 8 digits (with or without hyphen)
    pub invalid: Vec<String>,

    /// Valid rows that repeated an earlier code
    pub duplicates: usize,
}

impl CsvCheck {
    /// Number of data rows read
    pub fn rows(&self) -> usize {
        self.valid.len() + self.invalid.len() + self.duplicates
    }
}

/// Reads and validates a handoff CSV
///
/// Values are accepted with or without hyphen.
///
/// # Errors
///
/// Fails if the file does not exist, has no `cep` column or has no data rows.
pub fn read_postal_codes(path: &Path) -> SinkResult<CsvCheck> {
    if !path.exists() {
        return Err(SinkError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let column = reader
        .headers()?
        .iter()
        .position(|h| h == CEP_COLUMN)
        .ok_or(SinkError::MissingColumn)?;

    let mut check = CsvCheck::default();
    let mut seen = HashSet::new();

    for record in reader.records() {
        let record = record?;
        let raw = record.get(column).unwrap_or("");

        match PostalCode::parse(raw) {
            Some(code) if seen.insert(code.clone()) => check.valid.push(code),
            Some(_) => check.duplicates += 1,
            None => check.invalid.push(raw.to_string()),
        }
    }

    if check.rows() == 0 {
        return Err(SinkError::Empty);
    }

    tracing::info!(
        "Read {} row(s) from {}: {} valid, {} invalid, {} duplicate",
        check.rows(),
        path.display(),
        check.valid.len(),
        check.invalid.len(),
        check.duplicates
    );
    if !check.invalid.is_empty() {
        let examples: Vec<&str> = check.invalid.iter().take(5).map(String::as_str).collect();
        tracing::warn!(
            "Found {} invalid value(s), e.g. {:?}",
            check.invalid.len(),
            examples
        );
    }

    Ok(check)
}

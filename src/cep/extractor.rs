use super::PostalCode;
use regex::Regex;
use std::sync::LazyLock;

/// Five digits, optional hyphen, three digits, on word boundaries
static CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{5}-?[0-9]{3}\b").expect("candidate pattern"));

/// Exact canonical form, nothing else
static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}-[0-9]{3}$").expect("canonical pattern"));

/// Record-detail links carry the code in the path: `/cep/NNNNN-NNN/`
static RECORD_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/cep/([0-9]{5}-[0-9]{3})(?:/|$|\?|#)").expect("record href pattern")
});

/// Scans text for postal code candidates
///
/// Every match is normalized, so `01310100` and `01310-100` both yield the
/// same `PostalCode`. Results keep first-occurrence order and are not
/// deduplicated; callers collect into a set when they need uniqueness.
///
/// # Example
///
/// ```
/// use cep_harvest::cep::extract_candidates;
///
/// let found = extract_candidates("Av. Paulista, 01310100 / Rua X 01311-000");
/// let canonical: Vec<String> = found.iter().map(|c| c.canonical()).collect();
/// assert_eq!(canonical, vec!["01310-100", "01311-000"]);
/// ```
pub fn extract_candidates(text: &str) -> Vec<PostalCode> {
    CANDIDATE
        .find_iter(text)
        .filter_map(|m| PostalCode::parse(m.as_str()))
        .collect()
}

/// Checks a code in canonical form against the format and region filter
///
/// `code` must be exactly `NNNNN-NNN`. When `region_prefix` is set the code
/// must also start with it (São Paulo capital codes all start with `0`).
/// This is the only gate for admission into the collected set.
pub fn is_valid(code: &str, region_prefix: Option<&str>) -> bool {
    if !CANONICAL.is_match(code) {
        return false;
    }

    match region_prefix {
        Some(prefix) => code.starts_with(prefix),
        None => true,
    }
}

/// Pulls the code out of a record-detail href, if it has one
pub fn extract_record_code(href: &str) -> Option<PostalCode> {
    RECORD_HREF
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| PostalCode::parse(m.as_str()))
}

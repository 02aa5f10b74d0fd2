//! HTML parser for extracting postal codes and container links
//!
//! Codes are extracted in two tiers:
//!
//! 1. **Structured**: the results table (`table#ul_list tbody#tbody_results`,
//!    first cell of each row: record href and anchor text) plus every anchor
//!    on the page whose href is a record-detail link (`/cep/NNNNN-NNN/`)
//! 2. **Text**: the whole page text, scanned only when tier 1 admitted
//!    nothing
//!
//! Every candidate passes through `is_valid` before it is kept. Links are
//! run through the `LinkClassifier` and only containers are returned.

use crate::cep::{extract_candidates, extract_record_code, is_valid, PostalCode};
use crate::url::{crawl_key, LinkClass, LinkClassifier};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// CSS selectors used on every page
struct Selectors {
    anchor: Selector,
    result_rows: Selector,
    cell: Selector,
    body: Selector,
}

impl Selectors {
    fn new() -> Option<Self> {
        Some(Self {
            anchor: Selector::parse("a[href]").ok()?,
            result_rows: Selector::parse("table#ul_list tbody#tbody_results tr").ok()?,
            cell: Selector::parse("td").ok()?,
            body: Selector::parse("body").ok()?,
        })
    }
}

/// Which extraction tier produced a page's codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    /// Results table or record links
    Structured,
    /// Whole-page text fallback
    Text,
}

/// Codes and links extracted from one page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Valid codes found on the page
    pub items: HashSet<PostalCode>,

    /// Container links to enqueue (resolved and normalized)
    pub links: HashSet<Url>,

    /// The tier that produced `items`
    pub tier: ExtractionTier,

    /// Number of anchors classified, by outcome: container, record, excluded, invalid
    pub link_counts: [usize; 4],
}

/// Parses HTML and extracts codes and container links
///
/// # Arguments
///
/// * `html` - The page body
/// * `page_url` - The URL the body was served from; relative hrefs resolve against it
/// * `classifier` - Decides which links are containers
/// * `region_prefix` - Optional leading digits every admitted code must have
///
/// # Example
///
/// ```
/// use cep_harvest::config::ClassifierConfig;
/// use cep_harvest::crawler::parse_page;
/// use cep_harvest::url::{normalize_url, LinkClassifier};
///
/// let base = normalize_url("https://example.com/sp/sao-paulo/").unwrap();
/// let classifier = LinkClassifier::new(base.clone(), &ClassifierConfig::default());
/// let html = r#"<p>01310-100</p><a href="/sp/sao-paulo/moema/">Moema</a>"#;
///
/// let parsed = parse_page(html, &base, &classifier, Some("0"));
/// assert_eq!(parsed.items.len(), 1);
/// assert_eq!(parsed.links.len(), 1);
/// ```
pub fn parse_page(
    html: &str,
    page_url: &Url,
    classifier: &LinkClassifier,
    region_prefix: Option<&str>,
) -> ParsedPage {
    let Some(selectors) = Selectors::new() else {
        tracing::error!("Failed to build page selectors; skipping {}", page_url);
        return ParsedPage {
            items: HashSet::new(),
            links: HashSet::new(),
            tier: ExtractionTier::Text,
            link_counts: [0; 4],
        };
    };
    let document = Html::parse_document(html);

    let mut items = extract_structured(&document, &selectors, region_prefix);
    let tier = if items.is_empty() {
        items = extract_text(&document, &selectors, region_prefix);
        ExtractionTier::Text
    } else {
        ExtractionTier::Structured
    };

    let (links, link_counts) = extract_links(&document, &selectors, page_url, classifier);

    ParsedPage {
        items,
        links,
        tier,
        link_counts,
    }
}

fn admit(code: PostalCode, region_prefix: Option<&str>, into: &mut HashSet<PostalCode>) {
    if is_valid(&code.canonical(), region_prefix) {
        into.insert(code);
    }
}

/// Tier 1: results table rows and record-detail anchors
fn extract_structured(
    document: &Html,
    selectors: &Selectors,
    region_prefix: Option<&str>,
) -> HashSet<PostalCode> {
    let mut items = HashSet::new();

    for row in document.select(&selectors.result_rows) {
        let Some(first_cell) = row.select(&selectors.cell).next() else {
            continue;
        };

        for anchor in first_cell.select(&selectors.anchor) {
            if let Some(code) = anchor.value().attr("href").and_then(extract_record_code) {
                admit(code, region_prefix, &mut items);
            }
            for code in extract_candidates(&element_text(&anchor)) {
                admit(code, region_prefix, &mut items);
            }
        }
    }

    for anchor in document.select(&selectors.anchor) {
        if let Some(code) = anchor.value().attr("href").and_then(extract_record_code) {
            admit(code, region_prefix, &mut items);
        }
    }

    items
}

/// Tier 2: every code in the page text
fn extract_text(
    document: &Html,
    selectors: &Selectors,
    region_prefix: Option<&str>,
) -> HashSet<PostalCode> {
    let text = match document.select(&selectors.body).next() {
        Some(body) => element_text(&body),
        None => element_text(&document.root_element()),
    };

    let mut items = HashSet::new();
    for code in extract_candidates(&text) {
        admit(code, region_prefix, &mut items);
    }
    items
}

/// Joins text nodes with spaces so adjacent cells never fuse into one number
fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn extract_links(
    document: &Html,
    selectors: &Selectors,
    page_url: &Url,
    classifier: &LinkClassifier,
) -> (HashSet<Url>, [usize; 4]) {
    let mut links = HashSet::new();
    let mut keys = HashSet::new();
    let mut counts = [0usize; 4];

    for anchor in document.select(&selectors.anchor) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        let verdict = classifier.classify(href, page_url);
        let slot = match verdict.class {
            LinkClass::Container => 0,
            LinkClass::IndividualRecord => 1,
            LinkClass::Excluded => 2,
            LinkClass::Invalid => 3,
        };
        counts[slot] += 1;

        tracing::trace!("{} -> {:?} ({})", href, verdict.class, verdict.rule);

        if verdict.class.should_enqueue() {
            // First spelling of a page wins; `/a` and `/a/` are one link
            if let Some(target) = verdict.target {
                if keys.insert(crawl_key(&target)) {
                    links.insert(target);
                }
            }
        }
    }

    (links, counts)
}

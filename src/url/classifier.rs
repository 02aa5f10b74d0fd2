//! Link classification for the neighborhood-listing site
//!
//! Every href found on a page is resolved against that page's URL and then
//! run through an ordered list of named rules. The first rule that applies
//! decides the class, so the heuristic reads top to bottom:
//!
//! | Order | Rule               | Class              |
//! |-------|--------------------|--------------------|
//! | 1     | `off-authority`    | `Excluded`         |
//! | 2     | `base-self-loop`   | `Excluded`         |
//! | 3     | `excluded-section` | `Excluded`         |
//! | 4     | `record-detail`    | `IndividualRecord` |
//! | 5     | `sub-region`       | `Container`        |
//! | -     | `outside-prefix`   | `Excluded`         |
//!
//! Hrefs that cannot be resolved at all are `Invalid` (rule `unparsable`).

use super::{normalize_parsed, path_segments, same_authority};
use crate::config::ClassifierConfig;
use url::Url;

/// Outcome of classifying one href
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// A listing page under the base path naming a sub-region; enqueued
    Container,
    /// A record-detail page; never enqueued
    IndividualRecord,
    /// Noise: off-site, denylisted section, self-loop or outside the prefix
    Excluded,
    /// Empty or unresolvable href
    Invalid,
}

impl LinkClass {
    /// Returns true if links of this class go into the frontier
    pub fn should_enqueue(&self) -> bool {
        matches!(self, Self::Container)
    }
}

/// The class of a link together with the rule that decided it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkVerdict {
    pub class: LinkClass,
    /// Name of the deciding rule
    pub rule: &'static str,
    /// The resolved, normalized target (absent for `Invalid`)
    pub target: Option<Url>,
}

struct Rule {
    name: &'static str,
    class: LinkClass,
    applies: fn(&LinkClassifier, &Url) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        name: "off-authority",
        class: LinkClass::Excluded,
        applies: LinkClassifier::is_off_authority,
    },
    Rule {
        name: "base-self-loop",
        class: LinkClass::Excluded,
        applies: LinkClassifier::is_base,
    },
    Rule {
        name: "excluded-section",
        class: LinkClass::Excluded,
        applies: LinkClassifier::in_excluded_section,
    },
    Rule {
        name: "record-detail",
        class: LinkClass::IndividualRecord,
        applies: LinkClassifier::is_record_detail,
    },
    Rule {
        name: "sub-region",
        class: LinkClass::Container,
        applies: LinkClassifier::names_sub_region,
    },
];

const FALLBACK_RULE: &str = "outside-prefix";
const UNPARSABLE_RULE: &str = "unparsable";

/// Href schemes that never lead to a page
const NON_NAVIGABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Classifies hrefs relative to a fixed crawl base URL
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    base: Url,
    base_segments: Vec<String>,
    excluded_sections: Vec<String>,
    record_segments: Vec<String>,
    placeholder_segments: Vec<String>,
}

impl LinkClassifier {
    /// Creates a classifier for the given (already normalized) base URL
    pub fn new(base: Url, config: &ClassifierConfig) -> Self {
        let lower = |items: &[String]| -> Vec<String> {
            items.iter().map(|s| s.to_lowercase()).collect()
        };

        Self {
            base_segments: path_segments(&base),
            base,
            excluded_sections: lower(&config.excluded_sections),
            record_segments: lower(&config.record_segments),
            placeholder_segments: lower(&config.placeholder_segments),
        }
    }

    /// The crawl base URL
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Classifies `href` as found on the page at `page_url`
    ///
    /// Relative hrefs resolve against `page_url`; the rules then compare the
    /// result with the crawl base.
    ///
    /// # Example
    ///
    /// ```
    /// use cep_harvest::config::ClassifierConfig;
    /// use cep_harvest::url::{normalize_url, LinkClass, LinkClassifier};
    ///
    /// let base = normalize_url("https://example.com/pt-br/brasil/sp/sao-paulo/").unwrap();
    /// let classifier = LinkClassifier::new(base.clone(), &ClassifierConfig::default());
    ///
    /// let verdict = classifier.classify("/pt-br/brasil/sp/sao-paulo/bela-vista/", &base);
    /// assert_eq!(verdict.class, LinkClass::Container);
    ///
    /// let verdict = classifier.classify("/pt-br/brasil/cep/01310-100/", &base);
    /// assert_eq!(verdict.class, LinkClass::IndividualRecord);
    /// ```
    pub fn classify(&self, href: &str, page_url: &Url) -> LinkVerdict {
        let Some(target) = resolve(href, page_url) else {
            return LinkVerdict {
                class: LinkClass::Invalid,
                rule: UNPARSABLE_RULE,
                target: None,
            };
        };

        let (class, rule) = RULES
            .iter()
            .find(|rule| (rule.applies)(self, &target))
            .map(|rule| (rule.class, rule.name))
            .unwrap_or((LinkClass::Excluded, FALLBACK_RULE));

        LinkVerdict {
            class,
            rule,
            target: Some(target),
        }
    }

    fn is_off_authority(&self, url: &Url) -> bool {
        !same_authority(url, &self.base)
    }

    fn is_base(&self, url: &Url) -> bool {
        path_segments(url) == self.base_segments
    }

    fn in_excluded_section(&self, url: &Url) -> bool {
        path_segments(url)
            .iter()
            .any(|segment| self.excluded_sections.contains(segment))
    }

    fn is_record_detail(&self, url: &Url) -> bool {
        path_segments(url)
            .iter()
            .any(|segment| self.record_segments.contains(segment))
    }

    fn names_sub_region(&self, url: &Url) -> bool {
        let segments = path_segments(url);

        if !segments.starts_with(&self.base_segments) {
            return false;
        }

        match segments.get(self.base_segments.len()) {
            Some(next) => !self.placeholder_segments.contains(next),
            None => false,
        }
    }
}

/// Resolves an href against the page it was found on
fn resolve(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if NON_NAVIGABLE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return None;
    }

    let joined = page_url.join(href).ok()?;
    normalize_parsed(joined).ok()
}

use crate::UrlError;
use url::Url;

/// Query parameters that never change page content
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Normalizes a URL into the form that is queued and fetched
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme and a host
/// 3. Normalize path:
///    - Collapse repeated slashes
///    - Remove dot segments (. and ..)
///    - Keep a single trailing slash if the path had one
/// 4. Remove fragment (everything after #)
/// 5. Remove tracking query parameters, drop an empty query string
///
/// The host is lowercased by the parser itself. The trailing slash is kept
/// because relative hrefs on the fetched page resolve against it; use
/// `crawl_key` to compare two pages.
///
/// # Examples
///
/// ```
/// use cep_harvest::url::normalize_url;
///
/// let url = normalize_url("https://Example.com//sp/./sao-paulo/#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/sp/sao-paulo/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already parsed URL (e.g. the result of `Url::join`)
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Identity of a normalized URL for deduplication
///
/// Drops the trailing slash (except at root), so `/a` and `/a/` are the
/// same page.
///
/// ```
/// use cep_harvest::url::{crawl_key, normalize_url};
///
/// let a = normalize_url("https://example.com/sp/sao-paulo/").unwrap();
/// let b = normalize_url("https://example.com/sp/sao-paulo").unwrap();
/// assert_ne!(a, b);
/// assert_eq!(crawl_key(&a), crawl_key(&b));
/// ```
pub fn crawl_key(url: &Url) -> Url {
    let path = url.path();
    if path.len() <= 1 || !path.ends_with('/') {
        return url.clone();
    }

    let mut key = url.clone();
    key.set_path(path.trim_end_matches('/'));
    key
}

/// Normalizes a URL path by removing dot segments and repeated slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let trailing = if path.ends_with('/') { "/" } else { "" };
    format!("/{}{}", segments.join("/"), trailing)
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

//! URL handling module for cep-harvest
//!
//! This module provides URL normalization with its deduplication key,
//! and the link classifier that decides which hrefs are worth visiting.

mod classifier;
mod normalize;

pub use classifier::{LinkClass, LinkClassifier, LinkVerdict};
pub use normalize::{crawl_key, normalize_parsed, normalize_url};

use url::Url;

/// Returns true if both URLs share scheme, host and port
pub fn same_authority(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Lowercased, non-empty path segments of a URL
pub fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

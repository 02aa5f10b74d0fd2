use crate::cep::PostalCode;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::parse_page;
use crate::url::LinkClassifier;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// What one worker produced for one URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkResult {
    /// Valid codes found on the page
    pub items: HashSet<PostalCode>,

    /// Container links found on the page
    pub links: HashSet<Url>,

    /// True if the fetch failed; `items` and `links` are then empty
    pub failed: bool,
}

impl WorkResult {
    fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }
}

/// Fetches one URL and turns the page into codes and container links
///
/// Workers hold no crawl state. The scheduler claims a URL from the
/// `Frontier`, hands it to an idle worker and merges the `WorkResult`
/// back in.
#[derive(Debug, Clone)]
pub struct CrawlWorker {
    id: usize,
    fetcher: PageFetcher,
    classifier: Arc<LinkClassifier>,
    region_prefix: Option<String>,
}

impl CrawlWorker {
    pub fn new(
        id: usize,
        fetcher: PageFetcher,
        classifier: Arc<LinkClassifier>,
        region_prefix: Option<String>,
    ) -> Self {
        Self {
            id,
            fetcher,
            classifier,
            region_prefix,
        }
    }

    /// Worker number, used in logs
    pub fn id(&self) -> usize {
        self.id
    }

    /// A copy of this worker under a new id, sharing its HTTP client
    pub fn with_id(&self, id: usize) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }

    /// Processes a single claimed URL
    ///
    /// A fetch failure is logged and yields an empty result. The URL is
    /// already marked visited, so it is never tried again.
    pub async fn run(&self, url: &Url) -> WorkResult {
        tracing::debug!("[worker {}] Fetching {}", self.id, url);

        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("[worker {}] {}", self.id, e);
                return WorkResult::failed();
            }
        };

        let parsed = parse_page(
            &page.body,
            &page.final_url,
            &self.classifier,
            self.region_prefix.as_deref(),
        );

        tracing::debug!(
            "[worker {}] {}: {} codes ({:?}), {} container links, anchors {:?}",
            self.id,
            url,
            parsed.items.len(),
            parsed.tier,
            parsed.links.len(),
            parsed.link_counts
        );

        WorkResult {
            items: parsed.items,
            links: parsed.links,
            failed: false,
        }
    }
}

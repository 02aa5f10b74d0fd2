//! Crawler module for fetching listing pages and collecting postal codes
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a per-request timeout
//! - Two-tier postal code extraction and container link discovery
//! - The worker pool, its pacing and the `Running -> Draining -> Done` lifecycle
//! - Overall crawl coordination and the CSV handoff

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod worker;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchError, FetchedPage, PageFetcher};
pub use parser::{parse_page, ExtractionTier, ParsedPage};
pub use scheduler::{effective_delay, CrawlOutcome, CrawlScheduler, CrawlSummary};
pub use worker::{CrawlWorker, WorkResult};

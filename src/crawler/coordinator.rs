//! Crawler coordinator - wires the crawl together
//!
//! This module builds everything a crawl needs from a `Config`:
//! - The normalized base URL and a `Frontier` seeded with it
//! - One `CrawlWorker` per configured worker, each with its own HTTP client
//! - The `CrawlScheduler` and its pacing delay
//!
//! It then runs the scheduler and writes the trimmed result to the CSV.

use crate::config::Config;
use crate::crawler::scheduler::{effective_delay, CrawlScheduler};
use crate::crawler::worker::CrawlWorker;
use crate::crawler::PageFetcher;
use crate::output::{write_postal_codes, CrawlReport};
use crate::state::Frontier;
use crate::url::{normalize_url, LinkClassifier};
use crate::{ConfigError, HarvestError};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    base: Url,
    frontier: Arc<Frontier>,
    stop: Arc<AtomicBool>,
}

impl Coordinator {
    /// Creates a coordinator for one crawl
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawler configuration
    /// * `stop` - Raised from outside to halt the crawl early
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The base URL could not be normalized
    pub fn new(config: Config, stop: Arc<AtomicBool>) -> Result<Self, HarvestError> {
        let base = normalize_url(&config.crawler.base_url)?;
        let frontier = Arc::new(Frontier::new(base.clone()));

        Ok(Self {
            config,
            base,
            frontier,
            stop,
        })
    }

    /// The normalized crawl root
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Shared crawl state
    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.frontier
    }

    /// Delay the scheduler inserts after each completed page
    pub fn delay(&self) -> Duration {
        let crawler = &self.config.crawler;
        effective_delay(
            Duration::from_millis(crawler.request_delay_ms),
            crawler.workers,
            Duration::from_millis(crawler.min_parallel_delay_ms),
        )
    }

    fn build_workers(&self) -> Result<Vec<CrawlWorker>, HarvestError> {
        let classifier = Arc::new(LinkClassifier::new(
            self.base.clone(),
            &self.config.classifier,
        ));
        let timeout = Duration::from_secs(self.config.crawler.timeout_secs);

        (0..self.config.crawler.workers)
            .map(|id| -> Result<CrawlWorker, HarvestError> {
                let fetcher = PageFetcher::new(&self.config.user_agent, timeout)?;
                Ok(CrawlWorker::new(
                    id,
                    fetcher,
                    Arc::clone(&classifier),
                    self.config.crawler.region_prefix.clone(),
                ))
            })
            .collect()
    }

    /// Runs the crawl and writes the CSV
    ///
    /// The CSV is written for every terminal outcome, including a halted or
    /// exhausted crawl that fell short of the target.
    pub async fn run(self) -> Result<CrawlReport, HarvestError> {
        let started_at = Utc::now();
        let target = self.config.crawler.target;
        let csv_path = PathBuf::from(&self.config.output.csv_path);

        tracing::info!(
            "Starting crawl of {} (target {}, {} worker(s))",
            self.base,
            target,
            self.config.crawler.workers
        );

        let workers = self.build_workers()?;
        let scheduler = CrawlScheduler::new(
            Arc::clone(&self.frontier),
            workers,
            target,
            self.delay(),
            Arc::clone(&self.stop),
        )
        .ok_or_else(|| ConfigError::Validation("workers must be >= 1".to_string()))?;

        let summary = scheduler.run().await;
        let written = write_postal_codes(&summary.items, &csv_path)?;
        let finished_at = Utc::now();

        tracing::info!(
            "Crawl finished ({}): {} page(s) visited, {} code(s) written in {}s",
            summary.outcome,
            summary.pages_visited,
            written,
            (finished_at - started_at).num_seconds()
        );

        Ok(CrawlReport::new(
            &summary,
            target,
            written,
            csv_path,
            started_at,
            finished_at,
        ))
    }
}

/// Runs a complete crawl
///
/// This function orchestrates the whole process:
///
/// 1. Normalize the base URL and seed the frontier with it
/// 2. Build one worker (and HTTP client) per configured worker
/// 3. Run the scheduler until the target is reached, the frontier is
///    exhausted or `stop` is raised
/// 4. Trim the collected set to the target
/// 5. Write the sorted CSV and return the report
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `stop` - External cancellation flag (wired to Ctrl-C by the binary)
///
/// # Example
///
/// ```no_run
/// use cep_harvest::config::load_config;
/// use cep_harvest::crawler::run_crawl;
/// use std::path::Path;
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let report = run_crawl(config, Arc::new(AtomicBool::new(false))).await?;
/// println!("{} codes written", report.written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, stop: Arc<AtomicBool>) -> Result<CrawlReport, HarvestError> {
    Coordinator::new(config, stop)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierConfig, CrawlerConfig, OutputConfig, UserAgentConfig};

    fn create_test_config(workers: usize) -> Config {
        Config {
            crawler: CrawlerConfig {
                base_url: "https://codigo-postal.org/pt-br/brasil/sp/sao-paulo/".to_string(),
                target: 100,
                workers,
                timeout_secs: 5,
                request_delay_ms: 2000,
                min_parallel_delay_ms: 500,
                region_prefix: Some("0".to_string()),
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestCrawler".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                csv_path: "./ceps.csv".to_string(),
            },
            classifier: ClassifierConfig::default(),
        }
    }

    fn coordinator(workers: usize) -> Coordinator {
        Coordinator::new(create_test_config(workers), Arc::new(AtomicBool::new(false))).unwrap()
    }

    #[test]
    fn test_coordinator_seeds_frontier_with_base() {
        let coordinator = coordinator(1);

        assert_eq!(
            coordinator.base().as_str(),
            "https://codigo-postal.org/pt-br/brasil/sp/sao-paulo/"
        );
        assert!(coordinator.frontier().is_pending(coordinator.base()));
        assert_eq!(coordinator.frontier().size().pending, 1);
    }

    #[test]
    fn test_coordinator_delay_by_mode() {
        assert_eq!(coordinator(1).delay(), Duration::from_millis(2000));
        assert_eq!(coordinator(2).delay(), Duration::from_millis(1000));
        assert_eq!(coordinator(10).delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_builds_one_worker_per_slot() {
        let workers = coordinator(3).build_workers().unwrap();
        let ids: Vec<usize> = workers.iter().map(CrawlWorker::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let mut config = create_test_config(1);
        config.crawler.base_url = "ftp://example.com/".to_string();

        let result = Coordinator::new(config, Arc::new(AtomicBool::new(false)));
        assert!(result.is_err());
    }
}

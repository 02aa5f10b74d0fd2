//! End-of-run report

use crate::crawler::{CrawlOutcome, CrawlSummary};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Everything the caller learns about a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,

    /// Requested item count
    pub target: usize,

    /// Pages whose fetch was attempted
    pub pages_visited: usize,

    /// Pages whose fetch failed
    pub pages_failed: usize,

    /// Codes collected before the final trim
    pub collected: usize,

    /// Rows written to the CSV
    pub written: usize,

    /// Codes dropped by the final trim
    pub trimmed: usize,

    /// Where the CSV was written
    pub csv_path: PathBuf,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Builds a report from the scheduler's summary
    pub fn new(
        summary: &CrawlSummary,
        target: usize,
        written: usize,
        csv_path: PathBuf,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            outcome: summary.outcome,
            target,
            pages_visited: summary.pages_visited,
            pages_failed: summary.pages_failed,
            collected: summary.collected,
            written,
            trimmed: summary.trimmed(),
            csv_path,
            started_at,
            finished_at,
        }
    }

    /// Wall-clock duration of the crawl in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// True if the CSV holds exactly `target` codes
    pub fn is_complete(&self) -> bool {
        self.written == self.target
    }
}

/// Prints the report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Outcome: {}", report.outcome);
    println!(
        "  Started:  {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Finished: {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Duration: {}s", report.duration_seconds());
    println!();

    println!("Pages:");
    println!("  Visited: {}", report.pages_visited);
    println!("  Failed: {}", report.pages_failed);
    println!();

    println!("Postal codes:");
    println!("  Collected: {}", report.collected);
    if report.trimmed > 0 {
        println!("  Trimmed (overshoot): {}", report.trimmed);
    }
    println!("  Written: {} / {} target", report.written, report.target);
    println!("  CSV: {}", report.csv_path.display());

    if !report.is_complete() {
        println!(
            "\nTarget not reached: {} code(s) short",
            report.target.saturating_sub(report.written)
        );
    }
}

//! Scheduler driving the worker pool against the frontier
//!
//! This module handles:
//! - Claiming URLs from the `Frontier` for idle workers
//! - Merging each worker's result as soon as it completes
//! - Pacing completions with the configured request delay
//! - Moving through `Running -> Draining -> Done` and trimming the result

use crate::cep::PostalCode;
use crate::crawler::worker::{CrawlWorker, WorkResult};
use crate::state::{CrawlPhase, Frontier};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use url::Url;

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The collected set reached the target count
    TargetReached,
    /// Nothing was left to claim and no worker was active
    FrontierExhausted,
    /// The external stop signal was raised
    Halted,
}

impl CrawlOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetReached => "target reached",
            Self::FrontierExhausted => "frontier exhausted",
            Self::Halted => "halted",
        }
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a finished scheduler hands back
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub outcome: CrawlOutcome,

    /// Pages whose fetch was attempted
    pub pages_visited: usize,

    /// Pages whose fetch failed (or whose worker panicked)
    pub pages_failed: usize,

    /// Size of the collected set before trimming
    pub collected: usize,

    /// The finalized codes: sorted, at most `target` of them
    pub items: Vec<PostalCode>,
}

impl CrawlSummary {
    /// Number of codes removed by the final trim
    pub fn trimmed(&self) -> usize {
        self.collected.saturating_sub(self.items.len())
    }
}

type Completion = (CrawlWorker, Url, WorkResult);

/// Drives a bounded pool of `CrawlWorker`s until the target is reached
///
/// With one worker the crawl is strictly sequential and breadth-first. With
/// N workers up to N fetches are in flight at once; each completion is
/// merged into the frontier immediately and the target is re-checked right
/// after. Once the target is reached (or the stop flag is raised) nothing
/// new is claimed, but fetches already in flight always finish and are
/// merged before the set is trimmed.
pub struct CrawlScheduler {
    frontier: Arc<Frontier>,
    idle: Vec<CrawlWorker>,
    in_flight: JoinSet<Completion>,
    spare: CrawlWorker,
    next_worker_id: usize,
    target: usize,
    delay: Duration,
    phase: CrawlPhase,
    outcome: Option<CrawlOutcome>,
    stop: Arc<AtomicBool>,
    pages_visited: usize,
    pages_failed: usize,
}

impl CrawlScheduler {
    /// Creates a scheduler over `workers`
    ///
    /// # Arguments
    ///
    /// * `frontier` - Shared crawl state, seeded with the root URL
    /// * `workers` - The pool; its length is the concurrency degree (must be non-empty)
    /// * `target` - Exact number of codes to collect
    /// * `delay` - Pause after each completion (already divided for parallel mode)
    /// * `stop` - External cancellation flag
    pub fn new(
        frontier: Arc<Frontier>,
        workers: Vec<CrawlWorker>,
        target: usize,
        delay: Duration,
        stop: Arc<AtomicBool>,
    ) -> Option<Self> {
        let spare = workers.first()?.clone();
        let next_worker_id = workers.len();

        Some(Self {
            frontier,
            idle: workers,
            in_flight: JoinSet::new(),
            spare,
            next_worker_id,
            target,
            delay,
            phase: CrawlPhase::Running,
            outcome: None,
            stop,
            pages_visited: 0,
            pages_failed: 0,
        })
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Runs the crawl to completion and returns the trimmed result
    pub async fn run(mut self) -> CrawlSummary {
        tracing::info!(
            "Scheduler started: {} worker(s), target {}, delay {:?}",
            self.idle.len(),
            self.target,
            self.delay
        );

        while !self.phase.is_terminal() {
            match self.phase {
                CrawlPhase::Running => self.step().await,
                CrawlPhase::Draining => self.drain().await,
                CrawlPhase::Done => {}
            }
        }

        self.finalize()
    }

    /// One iteration of the running phase: dispatch, wait for a completion, pace
    async fn step(&mut self) {
        if let Some(outcome) = self.stop_reason() {
            self.begin_draining(outcome);
            return;
        }

        self.dispatch();

        let Some(joined) = self.in_flight.join_next().await else {
            self.begin_draining(CrawlOutcome::FrontierExhausted);
            return;
        };
        self.complete(joined);

        if self.stop_reason().is_none() && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn stop_reason(&self) -> Option<CrawlOutcome> {
        if self.frontier.collected_count() >= self.target {
            Some(CrawlOutcome::TargetReached)
        } else if self.stop.load(Ordering::SeqCst) {
            Some(CrawlOutcome::Halted)
        } else {
            None
        }
    }

    /// Claims one URL per idle worker and spawns the fetches
    fn dispatch(&mut self) {
        if !self.phase.accepts_claims() || self.idle.is_empty() {
            return;
        }

        let claimed = self.frontier.try_claim(self.idle.len());
        if !claimed.is_empty() {
            tracing::debug!("Claimed {} URL(s)", claimed.len());
        }

        for url in claimed {
            let Some(worker) = self.idle.pop() else {
                break;
            };
            self.in_flight.spawn(async move {
                let result = worker.run(&url).await;
                (worker, url, result)
            });
        }
    }

    fn complete(&mut self, joined: Result<Completion, JoinError>) {
        self.pages_visited += 1;

        match joined {
            Ok((worker, url, result)) => {
                if result.failed {
                    self.pages_failed += 1;
                }

                let found = result.items.len();
                let delta = self.frontier.merge_result(result.items, result.links);
                let size = self.frontier.size();

                tracing::info!(
                    "{}: +{} new code(s) ({} on page), {} new link(s) | {}/{} collected, {} pending, {} visited",
                    url,
                    delta.new_items,
                    found,
                    delta.new_links,
                    delta.collected,
                    self.target,
                    size.pending,
                    size.visited
                );

                self.idle.push(worker);
            }
            Err(e) => {
                self.pages_failed += 1;
                tracing::error!("Crawl worker task failed: {}", e);

                let replacement = self.spare.with_id(self.next_worker_id);
                self.next_worker_id += 1;
                self.idle.push(replacement);
            }
        }
    }

    fn begin_draining(&mut self, outcome: CrawlOutcome) {
        self.transition(CrawlPhase::Draining);
        self.outcome = Some(outcome);
        tracing::info!(
            "Crawl {}; draining {} in-flight fetch(es)",
            outcome,
            self.in_flight.len()
        );
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            self.complete(joined);
        }
        self.transition(CrawlPhase::Done);
    }

    fn transition(&mut self, next: CrawlPhase) {
        if self.phase.can_transition_to(next) {
            tracing::debug!("Scheduler phase {} -> {}", self.phase, next);
            self.phase = next;
        }
    }

    fn finalize(self) -> CrawlSummary {
        let collected = self.frontier.collected_count();
        let items = self.frontier.finalize(self.target);
        let outcome = self.outcome.unwrap_or(CrawlOutcome::FrontierExhausted);

        if items.len() < collected {
            tracing::info!(
                "Trimmed {} overshoot code(s) to reach target {}",
                collected - items.len(),
                self.target
            );
        }

        CrawlSummary {
            outcome,
            pages_visited: self.pages_visited,
            pages_failed: self.pages_failed,
            collected,
            items,
        }
    }
}

/// Delay inserted after each completed page
///
/// Sequential crawls use the full delay. With N workers the delay is split N
/// ways, since the limit is on the aggregate request rate, but never drops
/// below `floor` (or below `delay` itself when that is smaller).
///
/// # Example
///
/// ```
/// use cep_harvest::crawler::effective_delay;
/// use std::time::Duration;
///
/// let delay = Duration::from_millis(2000);
/// let floor = Duration::from_millis(500);
///
/// assert_eq!(effective_delay(delay, 1, floor), delay);
/// assert_eq!(effective_delay(delay, 2, floor), Duration::from_millis(1000));
/// assert_eq!(effective_delay(delay, 8, floor), floor);
/// ```
pub fn effective_delay(delay: Duration, workers: usize, floor: Duration) -> Duration {
    if workers <= 1 {
        return delay;
    }

    let divisor = u32::try_from(workers).unwrap_or(u32::MAX);
    std::cmp::max(delay / divisor, std::cmp::min(floor, delay))
}

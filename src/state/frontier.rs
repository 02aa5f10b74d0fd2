use crate::cep::PostalCode;
use crate::url::crawl_key;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// Counts reported by `Frontier::size`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrontierSize {
    pub collected: usize,
    pub pending: usize,
    pub visited: usize,
}

/// What a single `merge_result` call changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeDelta {
    /// Codes that were not collected before
    pub new_items: usize,
    /// Links appended to the pending queue
    pub new_links: usize,
    /// Collected count after the merge
    pub collected: usize,
}

#[derive(Debug, Default)]
struct FrontierState {
    /// Crawl keys of claimed URLs
    visited: HashSet<Url>,
    /// URLs in the form they will be fetched
    pending: VecDeque<Url>,
    /// Crawl keys of `pending`, for O(1) membership checks
    queued: HashSet<Url>,
    collected: HashSet<PostalCode>,
    frozen: bool,
}

/// Shared crawl state: visited URLs, pending queue and collected codes
///
/// Workers never touch the underlying collections. Every change goes through
/// one of two atomic operations, `try_claim` and `merge_result`, each of
/// which holds the lock for a handful of set/queue operations and never
/// across I/O. This keeps `visited` and `pending` disjoint at all times.
///
/// URLs are expected to be normalized (see `crate::url::normalize_url`)
/// before they reach the frontier. Membership is decided by `crawl_key`,
/// while the queue keeps each URL as it was first discovered, trailing
/// slash included, because that is the URL the worker fetches.
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
}

impl Frontier {
    /// Creates a frontier whose only pending URL is the crawl root
    pub fn new(root: Url) -> Self {
        let mut state = FrontierState::default();
        state.queued.insert(crawl_key(&root));
        state.pending.push_back(root);

        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // Each critical section is a single set/queue operation, so the state
        // is consistent even if a holder panicked.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Pops up to `max_batch` pending URLs and marks them visited
    ///
    /// URLs are claimed in FIFO (breadth-first) order. Marking them visited
    /// at claim time, before any fetch, is what stops two workers from
    /// fetching the same page. Returns an empty vector when nothing is
    /// claimable or the frontier is frozen.
    pub fn try_claim(&self, max_batch: usize) -> Vec<Url> {
        let mut state = self.lock();
        let mut claimed = Vec::new();

        if state.frozen {
            return claimed;
        }

        while claimed.len() < max_batch {
            let Some(url) = state.pending.pop_front() else {
                break;
            };
            let key = crawl_key(&url);
            state.queued.remove(&key);

            if state.visited.insert(key) {
                claimed.push(url);
            }
        }

        claimed
    }

    /// Unions a worker's results into the shared state
    ///
    /// Codes are added to the collected set; each link that is neither
    /// visited nor already pending is appended to the queue. The operation is
    /// commutative with respect to collected codes, so completion order
    /// between workers does not matter. Ignored once the frontier is frozen.
    pub fn merge_result<I, L>(&self, items: I, links: L) -> MergeDelta
    where
        I: IntoIterator<Item = PostalCode>,
        L: IntoIterator<Item = Url>,
    {
        let mut state = self.lock();

        if state.frozen {
            tracing::warn!("Dropping merge into a frozen frontier");
            return MergeDelta {
                collected: state.collected.len(),
                ..MergeDelta::default()
            };
        }

        let mut delta = MergeDelta::default();

        for item in items {
            if state.collected.insert(item) {
                delta.new_items += 1;
            }
        }

        for link in links {
            let key = crawl_key(&link);
            if state.visited.contains(&key) || !state.queued.insert(key) {
                continue;
            }
            state.pending.push_back(link);
            delta.new_links += 1;
        }

        delta.collected = state.collected.len();
        delta
    }

    /// Consistent snapshot of the three collection sizes
    pub fn size(&self) -> FrontierSize {
        let state = self.lock();
        FrontierSize {
            collected: state.collected.len(),
            pending: state.pending.len(),
            visited: state.visited.len(),
        }
    }

    /// Number of collected codes
    pub fn collected_count(&self) -> usize {
        self.lock().collected.len()
    }

    /// Returns true if a fetch of `url` has been claimed
    pub fn is_visited(&self, url: &Url) -> bool {
        self.lock().visited.contains(&crawl_key(url))
    }

    /// Returns true if `url` is waiting in the queue
    pub fn is_pending(&self, url: &Url) -> bool {
        self.lock().queued.contains(&crawl_key(url))
    }

    /// Returns true once the frontier has been frozen
    pub fn is_frozen(&self) -> bool {
        self.lock().frozen
    }

    /// Freezes the frontier; later claims return nothing and merges are dropped
    pub fn freeze(&self) {
        self.lock().frozen = true;
    }

    /// Freezes the frontier and returns at most `target` collected codes
    ///
    /// See `trim_to_target` for the ordering guarantee.
    pub fn finalize(&self, target: usize) -> Vec<PostalCode> {
        let mut state = self.lock();
        state.frozen = true;
        trim_to_target(state.collected.iter().cloned(), target)
    }
}

/// Sorts codes by canonical form and keeps the first `target`
///
/// Trimming only removes overshoot; a set smaller than `target` is returned
/// whole. The result is deterministic no matter which worker finished last.
pub fn trim_to_target<I>(items: I, target: usize) -> Vec<PostalCode>
where
    I: IntoIterator<Item = PostalCode>,
{
    let mut sorted: Vec<PostalCode> = items.into_iter().collect();
    sorted.sort();
    sorted.dedup();
    sorted.truncate(target);
    sorted
}

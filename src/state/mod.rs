//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Frontier`: the visited set, pending queue and collected codes shared by
//!   every worker; the only synchronization point of a crawl
//! - `CrawlPhase`: the scheduler's `Running -> Draining -> Done` lifecycle

mod frontier;
mod phase;

// Re-export main types
pub use frontier::{trim_to_target, Frontier, FrontierSize, MergeDelta};
pub use phase::CrawlPhase;

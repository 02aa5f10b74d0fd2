//! Lifecycle phases of a crawl
//!
//! The scheduler only ever moves forward: `Running -> Draining -> Done`.

use std::fmt;

/// Represents the current phase of the crawl scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Claiming URLs and dispatching workers
    Running,

    /// No more claims; waiting for in-flight workers and merging their results
    Draining,

    /// Terminal; the frontier is frozen and ready for finalization
    Done,
}

impl CrawlPhase {
    /// Returns true if new URLs may be claimed in this phase
    pub fn accepts_claims(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Draining) | (Self::Draining, Self::Done)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_running_accepts_claims() {
        assert!(CrawlPhase::Running.accepts_claims());
        assert!(!CrawlPhase::Draining.accepts_claims());
        assert!(!CrawlPhase::Done.accepts_claims());
    }

    #[test]
    fn test_transitions_move_forward() {
        assert!(CrawlPhase::Running.can_transition_to(CrawlPhase::Draining));
        assert!(CrawlPhase::Draining.can_transition_to(CrawlPhase::Done));

        assert!(!CrawlPhase::Running.can_transition_to(CrawlPhase::Done));
        assert!(!CrawlPhase::Draining.can_transition_to(CrawlPhase::Running));
        assert!(!CrawlPhase::Done.can_transition_to(CrawlPhase::Running));
    }

    #[test]
    fn test_only_done_is_terminal() {
        assert!(!CrawlPhase::Running.is_terminal());
        assert!(!CrawlPhase::Draining.is_terminal());
        assert!(CrawlPhase::Done.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlPhase::Running), "running");
        assert_eq!(format!("{}", CrawlPhase::Draining), "draining");
        assert_eq!(format!("{}", CrawlPhase::Done), "done");
    }
}

//! Generic sleep-then-recheck polling.
//!
//! Every bounded wait in the orchestrator (added-indicator waits, render
//! progress) goes through [`poll_until`] so the timeout policy is testable in
//! one place.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of a bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The predicate returned true within the budget.
    Completed,
    /// The budget elapsed without the predicate turning true.
    TimedOut,
}

impl PollOutcome {
    pub fn completed(&self) -> bool {
        matches!(self, PollOutcome::Completed)
    }
}

/// Re-evaluate `predicate` every `interval` until it returns true or
/// `timeout` elapses.
///
/// The predicate is checked once immediately, so a zero timeout still gets
/// one evaluation.
pub async fn poll_until<F, Fut>(mut predicate: F, interval: Duration, timeout: Duration) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate().await {
            return PollOutcome::Completed;
        }
        if Instant::now() + interval > deadline {
            return PollOutcome::TimedOut;
        }
        tokio::time::sleep(interval).await;
    }
}

//! Cancellable delay between status polls

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full delay elapsed
    Elapsed,
    /// The token fired first
    Cancelled,
}

/// Suspend for at most `delay`, returning early if `cancel` fires.
pub async fn pause(delay: Duration, cancel: &CancellationToken) -> WaitOutcome {
    if cancel.is_cancelled() {
        return WaitOutcome::Cancelled;
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => WaitOutcome::Cancelled,
        _ = sleep(delay) => WaitOutcome::Elapsed,
    }
}

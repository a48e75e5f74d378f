//! Cooperative cancellation carrying a reason
//!
//! A thin wrapper over [`CancellationToken`] that remembers why the run was
//! cancelled, so the analyzer can report the reason in
//! [`AnalyzeError::Cancelled`](crate::error::AnalyzeError::Cancelled).

use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Shared cancellation signal
///
/// Clones observe the same signal. The first reason passed to
/// [`Cancellation::cancel`] wins; later calls are no-ops.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl Cancellation {
    /// Create a signal that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signal that is already cancelled
    pub fn cancelled_with(reason: impl Into<String>) -> Self {
        let signal = Self::new();
        signal.cancel(reason);
        signal
    }

    /// Cancel with `reason`
    pub fn cancel(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    /// Check whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason given to [`Cancellation::cancel`]
    pub fn reason(&self) -> Option<&str> {
        if !self.is_cancelled() {
            return None;
        }
        self.reason.get().map(String::as_str)
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// Marker returned by a worker that stopped because the run was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_reason_wins() {
        let signal = Cancellation::new();
        assert!(!signal.is_cancelled());
        assert_eq!(signal.reason(), None);

        let clone = signal.clone();
        clone.cancel("interrupted by user");
        signal.cancel("second");

        assert!(signal.is_cancelled());
        assert_eq!(signal.reason(), Some("interrupted by user"));
    }

    #[test]
    fn test_cancelled_with_carries_reason() {
        let signal = Cancellation::cancelled_with("deadline reached");
        assert!(signal.is_cancelled());
        assert_eq!(signal.clone().reason(), Some("deadline reached"));
    }

    #[test]
    fn test_cancelled_pending_until_signalled() {
        let signal = Cancellation::new();
        let mut waiter = tokio_test::task::spawn(signal.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        signal.cancel("stop");
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let signal = Cancellation::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        signal.cancel("stop");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}

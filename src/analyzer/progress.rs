//! Progress and verbose telemetry
//!
//! Callbacks are synchronous and run inline on the analysis task, so they
//! should return quickly. Progress events arrive in completion order with
//! `completed` counting 1, 2, ..., `total`; verbose events are informational
//! and may be ignored.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::FeedError;
use crate::models::{FeedAnalysisResult, FeedStatus, ParsedFeed};

/// One feed finished, successfully or not
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub feed_url: String,
    pub completed: usize,
    pub total: usize,
    pub status: FeedStatus,
    pub feed: Option<Arc<ParsedFeed>>,
    pub error: Option<FeedError>,
    pub duration_ms: Option<u64>,
}

impl ProgressUpdate {
    fn from_result(result: &FeedAnalysisResult, completed: usize, total: usize) -> Self {
        Self {
            feed_url: result.feed_url.clone(),
            completed,
            total,
            status: result.status(),
            feed: result.feed().cloned(),
            error: result.error().cloned(),
            duration_ms: result.duration_ms,
        }
    }
}

/// Informational message about one feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerboseEvent {
    pub feed_url: String,
    pub feed_title: Option<String>,
    pub message: String,
}

/// Receives one [`ProgressUpdate`] per input URL
pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Receives [`VerboseEvent`]s
pub type VerboseCallback = Arc<dyn Fn(&VerboseEvent) + Send + Sync>;

/// Millisecond timestamp source used for durations and the cutoff
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Wall-clock time in epoch milliseconds
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

/// Clock that always returns `now_ms`
pub fn fixed_clock(now_ms: i64) -> Clock {
    Arc::new(move || now_ms)
}

/// Elapsed milliseconds between two clock readings
///
/// A clock running backwards yields zero; a difference that does not fit
/// yields `None`.
pub fn elapsed_ms(start: i64, end: i64) -> Option<u64> {
    end.checked_sub(start)
        .map(|delta| u64::try_from(delta.max(0)).unwrap_or(0))
}

/// Completion counter shared by the workers of one run
///
/// The increment and the callback happen under one lock, so events are
/// delivered with strictly increasing `completed` values.
pub(crate) struct ProgressTracker {
    total: usize,
    completed: Mutex<usize>,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub(crate) fn new(total: usize, callback: Option<ProgressCallback>) -> Self {
        Self {
            total,
            completed: Mutex::new(0),
            callback,
        }
    }

    /// Count one finished feed and emit its update
    pub(crate) fn finish(&self, result: &FeedAnalysisResult) -> usize {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        *completed += 1;

        if let Some(callback) = &self.callback {
            callback(&ProgressUpdate::from_result(result, *completed, self.total));
        }

        *completed
    }

    pub(crate) fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sends verbose events for one feed
pub(crate) struct VerboseEmitter<'a> {
    callback: Option<&'a VerboseCallback>,
    feed_url: &'a str,
    feed_title: Option<&'a str>,
}

impl<'a> VerboseEmitter<'a> {
    pub(crate) fn new(
        callback: Option<&'a VerboseCallback>,
        feed_url: &'a str,
        feed_title: Option<&'a str>,
    ) -> Self {
        Self {
            callback,
            feed_url,
            feed_title,
        }
    }

    pub(crate) fn emit(&self, message: impl FnOnce() -> String) {
        if let Some(callback) = self.callback {
            callback(&VerboseEvent {
                feed_url: self.feed_url.to_string(),
                feed_title: self.feed_title.map(str::to_string),
                message: message(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedOutcome;
    use crate::utils::error::FetchError;

    fn rejected(url: &str) -> FeedAnalysisResult {
        FeedAnalysisResult {
            feed_url: url.to_string(),
            duration_ms: Some(7),
            outcome: FeedOutcome::Rejected {
                error: FetchError::Timeout.into(),
            },
        }
    }

    #[test]
    fn test_elapsed_ms() {
        assert_eq!(elapsed_ms(1_000, 1_250), Some(250));
        assert_eq!(elapsed_ms(1_000, 900), Some(0));
        assert_eq!(elapsed_ms(i64::MIN, i64::MAX), None);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = fixed_clock(42);
        assert_eq!(clock(), 42);
        assert_eq!(clock(), 42);
    }

    #[test]
    fn test_tracker_counts_and_emits() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let callback: ProgressCallback = {
            let seen = Arc::clone(&seen);
            Arc::new(move |update: &ProgressUpdate| {
                seen.lock()
                    .unwrap()
                    .push((update.feed_url.clone(), update.completed, update.total, update.status));
            })
        };

        let tracker = ProgressTracker::new(2, Some(callback));
        assert_eq!(tracker.finish(&rejected("b")), 1);
        assert_eq!(tracker.finish(&rejected("a")), 2);
        assert_eq!(tracker.completed(), 2);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("b".to_string(), 1, 2, FeedStatus::Rejected),
                ("a".to_string(), 2, 2, FeedStatus::Rejected),
            ]
        );
    }

    #[test]
    fn test_tracker_without_callback() {
        let tracker = ProgressTracker::new(1, None);
        assert_eq!(tracker.finish(&rejected("a")), 1);
    }

    #[test]
    fn test_verbose_emitter_is_lazy_without_callback() {
        let emitter = VerboseEmitter::new(None, "https://a.example/feed", None);
        emitter.emit(|| panic!("message should not be built"));
    }

    #[test]
    fn test_verbose_emitter_fills_feed_fields() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let callback: VerboseCallback = {
            let events = Arc::clone(&events);
            Arc::new(move |event: &VerboseEvent| events.lock().unwrap().push(event.clone()))
        };

        let emitter = VerboseEmitter::new(Some(&callback), "https://a.example/feed", Some("A"));
        emitter.emit(|| "hello".to_string());

        assert_eq!(
            *events.lock().unwrap(),
            vec![VerboseEvent {
                feed_url: "https://a.example/feed".into(),
                feed_title: Some("A".into()),
                message: "hello".into(),
            }]
        );
    }
}

//! Feed analysis orchestrator
//!
//! Drives the bounded pool over a list of feed URLs. Each unit of work
//! fetches its feed through the run's single-flight cache, keeps the posts
//! inside the recency window, classifies the ones with body text and runs
//! relevant verdicts through the false-positive guard.
//!
//! # Architecture
//!
//! ```text
//!  feed URLs ──▶ run_bounded (C lanes) ──▶ analyze_feed ──▶ results (input order)
//!                                             │
//!                       ┌─────────────────────┼──────────────────────┐
//!                       ▼                     ▼                      ▼
//!                  FetchCache            cutoff filter          Classifier
//!                (single flight)                              + FalsePositiveGuard
//!                                             │
//!                                    ProgressTracker ──▶ on_progress (completion order)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blogscout::analyzer::{AnalyzeOptions, FeedAnalyzer};
//! use blogscout::config::Config;
//! use blogscout::feed::HttpFeedFetcher;
//! use blogscout::llm::OllamaClassifier;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let analyzer = FeedAnalyzer::new(Arc::new(HttpFeedFetcher::new(&config.fetcher)?))
//!     .with_classifier(Arc::new(OllamaClassifier::new(&config.llm, &config.filter.topic)?));
//!
//! let urls = vec!["https://blog.rust-lang.org/feed.xml".to_string()];
//! let results = analyzer.analyze(&urls, &AnalyzeOptions::default()).await?;
//!
//! for result in &results {
//!     println!("{}: {}", result.feed_url, result.status().as_str());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cancel;
pub mod cutoff;
pub mod guard;
pub mod pool;
pub mod progress;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AnalyzerConfig;
use crate::error::{AnalyzeError, FeedError};
use crate::feed::FeedFetcher;
use crate::llm::{ClassifyOptions, Classifier};
use crate::models::{FeedAnalysisResult, FeedItem, FeedOutcome, FeedStatus, RelevantPost};
use crate::utils::truncate_text;

use cache::FetchCache;
use cutoff::{cutoff_from_millis, is_recent};
use pool::{run_bounded, PoolError};
use progress::{elapsed_ms, ProgressTracker, VerboseEmitter};

pub use cancel::{Cancellation, Cancelled};
pub use guard::{FalsePositiveGuard, GuardDecision};
pub use progress::{
    fixed_clock, system_clock, Clock, ProgressCallback, ProgressUpdate, VerboseCallback,
    VerboseEvent,
};

// ============================================================================
// Options
// ============================================================================

/// Per-call options for [`FeedAnalyzer::analyze`]
#[derive(Clone)]
pub struct AnalyzeOptions {
    /// Maximum number of feeds in flight (default: 3)
    pub concurrency: usize,

    /// Recency window in calendar months (default: 3)
    pub months: u32,

    /// Maximum characters of post text sent to the classifier
    pub max_text_chars: usize,

    /// Cancellation signal for the whole run
    pub cancel: Cancellation,

    /// Called once per input URL as it finishes
    pub on_progress: Option<ProgressCallback>,

    /// Called with informational per-feed messages
    pub on_verbose: Option<VerboseCallback>,

    /// Timestamp source for durations and the cutoff
    pub clock: Clock,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self::from(&AnalyzerConfig::default())
    }
}

impl From<&AnalyzerConfig> for AnalyzeOptions {
    fn from(config: &AnalyzerConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            months: config.months,
            max_text_chars: config.max_text_chars,
            cancel: Cancellation::new(),
            on_progress: None,
            on_verbose: None,
            clock: system_clock(),
        }
    }
}

impl AnalyzeOptions {
    /// Set the concurrency ceiling
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the recency window
    #[must_use]
    pub fn with_months(mut self, months: u32) -> Self {
        self.months = months;
        self
    }

    /// Use `cancel` as the run's cancellation signal
    #[must_use]
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set the progress callback
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressUpdate) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Set the verbose callback
    #[must_use]
    pub fn on_verbose<F>(mut self, callback: F) -> Self
    where
        F: Fn(&VerboseEvent) + Send + Sync + 'static,
    {
        self.on_verbose = Some(Arc::new(callback));
        self
    }

    /// Set the per-post text limit sent to the classifier
    #[must_use]
    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.max_text_chars = max_text_chars;
        self
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn validate(&self) -> Result<(), AnalyzeError> {
        if self.concurrency == 0 {
            return Err(AnalyzeError::InvalidConcurrency(self.concurrency));
        }
        if self.months == 0 {
            return Err(AnalyzeError::InvalidMonthWindow(self.months));
        }
        if self.max_text_chars == 0 {
            return Err(AnalyzeError::InvalidTextLimit(self.max_text_chars));
        }
        Ok(())
    }
}

impl From<PoolError> for AnalyzeError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::InvalidConcurrency(c) => Self::InvalidConcurrency(c),
            PoolError::Cancelled(reason) => Self::Cancelled { reason },
        }
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// Feed analysis orchestrator
pub struct FeedAnalyzer {
    fetcher: Arc<dyn FeedFetcher>,
    classifier: Option<Arc<dyn Classifier>>,
    guard: FalsePositiveGuard,
}

impl FeedAnalyzer {
    /// Create an analyzer over `fetcher`
    ///
    /// A classifier must be added with [`FeedAnalyzer::with_classifier`]
    /// before [`FeedAnalyzer::analyze`] will run.
    pub fn new(fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            fetcher,
            classifier: None,
            guard: FalsePositiveGuard::default(),
        }
    }

    /// Set the classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Replace the false-positive guard
    #[must_use]
    pub fn with_guard(mut self, guard: FalsePositiveGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Analyze every feed URL, returning one result per URL in input order
    ///
    /// Duplicate URLs share one fetch but each gets its own result. A feed
    /// that fails only rejects its own result.
    ///
    /// # Errors
    ///
    /// Fails before any work with a configuration error (zero concurrency,
    /// zero months, zero text limit, no classifier), or with [`AnalyzeError::Cancelled`] when
    /// the cancellation signal fires before every feed finished.
    pub async fn analyze(
        &self,
        feed_urls: &[String],
        options: &AnalyzeOptions,
    ) -> Result<Vec<FeedAnalysisResult>, AnalyzeError> {
        options.validate()?;
        let classifier = self
            .classifier
            .as_deref()
            .ok_or(AnalyzeError::MissingClassifier)?;
        if let Some(reason) = options.cancel.reason() {
            return Err(AnalyzeError::Cancelled {
                reason: reason.to_string(),
            });
        }

        info!(
            feeds = feed_urls.len(),
            concurrency = options.concurrency,
            months = options.months,
            "Starting feed analysis"
        );

        let run = Run {
            cache: FetchCache::new(Arc::clone(&self.fetcher)),
            progress: ProgressTracker::new(feed_urls.len(), options.on_progress.clone()),
            classifier,
            guard: &self.guard,
            options,
        };

        let outcome = run_bounded(feed_urls, options.concurrency, &options.cancel, |url, _| {
            run.analyze_feed(url.as_str())
        })
        .await;

        let results = match outcome {
            Ok(results) => results,
            Err(e) => {
                warn!(
                    completed = run.progress.completed(),
                    total = feed_urls.len(),
                    error = %e,
                    "Feed analysis aborted"
                );
                return Err(e.into());
            }
        };

        let rejected = results
            .iter()
            .filter(|r| r.status() == FeedStatus::Rejected)
            .count();
        let relevant: usize = results
            .iter()
            .filter_map(|r| r.relevant_posts().map(<[_]>::len))
            .sum();

        info!(
            feeds = results.len(),
            distinct_feeds = run.cache.len(),
            fulfilled = results.len() - rejected,
            rejected,
            relevant_posts = relevant,
            "Feed analysis finished"
        );

        Ok(results)
    }
}

// ============================================================================
// Per-run state
// ============================================================================

/// State owned by one `analyze` call and borrowed by its workers
struct Run<'a> {
    cache: FetchCache,
    progress: ProgressTracker,
    classifier: &'a dyn Classifier,
    guard: &'a FalsePositiveGuard,
    options: &'a AnalyzeOptions,
}

impl Run<'_> {
    /// One unit of work: fetch, filter, classify, report
    async fn analyze_feed(&self, url: &str) -> Result<FeedAnalysisResult, Cancelled> {
        let start = (self.options.clock)();
        let outcome = self.process(url).await?;
        let end = (self.options.clock)();

        let result = FeedAnalysisResult {
            feed_url: url.to_string(),
            duration_ms: elapsed_ms(start, end),
            outcome,
        };

        match result.error() {
            Some(error) => warn!(
                url = %url,
                category = error.category().as_str(),
                error = %error,
                "Feed rejected"
            ),
            None => debug!(
                url = %url,
                analyzed = result.analyzed_items().unwrap_or_default(),
                relevant = result.relevant_posts().map_or(0, <[_]>::len),
                duration_ms = ?result.duration_ms,
                "Feed analyzed"
            ),
        }

        self.progress.finish(&result);
        Ok(result)
    }

    async fn process(&self, url: &str) -> Result<FeedOutcome, Cancelled> {
        let cancel = &self.options.cancel;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled),
            fetched = self.cache.get(url) => fetched,
        };

        let feed = match fetched {
            Ok(feed) => feed,
            Err(error) => {
                return Ok(FeedOutcome::Rejected {
                    error: FeedError::Fetch(error),
                })
            }
        };

        let months = self.options.months;
        let cutoff = cutoff_from_millis((self.options.clock)(), months);
        let eligible: Vec<&FeedItem> = match cutoff {
            Some(cutoff) => feed
                .items
                .iter()
                .filter(|item| is_recent(item.published_at.as_deref(), cutoff))
                .collect(),
            None => {
                warn!(url = %url, "Clock reading out of range, no post is eligible");
                Vec::new()
            }
        };

        let verbose = VerboseEmitter::new(self.options.on_verbose.as_ref(), url, feed.title.as_deref());
        verbose.emit(|| {
            let since = cutoff.map_or_else(
                || "unknown".to_string(),
                |c| c.format("%Y-%m-%d").to_string(),
            );
            format!(
                "{} of {} posts within last {} months (since {})",
                eligible.len(),
                feed.items.len(),
                months,
                since
            )
        });

        let mut analyzed_items = 0;
        let mut relevant_posts = Vec::new();

        for item in eligible {
            let Some(body) = item.body_text() else {
                debug!(url = %url, post = %item.title, "Skipping post without body text");
                continue;
            };

            verbose.emit(|| format!("Analyzing post: {}", item.title));

            let text = truncate_text(&format!("{}\n\n{}", item.title, body), self.options.max_text_chars);
            analyzed_items += 1;

            let classified = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Cancelled),
                classified = self.classifier.classify(&text, ClassifyOptions::graceful()) => classified,
            };

            let verdict = match classified {
                Ok(verdict) => verdict,
                Err(error) => {
                    return Ok(FeedOutcome::Rejected {
                        error: error.into(),
                    })
                }
            };

            if !verdict.relevant {
                continue;
            }

            match self.guard.evaluate(&verdict, item) {
                GuardDecision::Accepted { .. } => relevant_posts.push(RelevantPost {
                    title: item.title.clone(),
                    link: item.link.clone(),
                    published_at: item.published_at.clone(),
                    analysis: verdict,
                }),
                decision => debug!(
                    url = %url,
                    post = %item.title,
                    decision = ?decision,
                    "Guard dropped relevant verdict"
                ),
            }
        }

        Ok(FeedOutcome::Fulfilled {
            feed,
            analyzed_items,
            relevant_posts,
        })
    }
}

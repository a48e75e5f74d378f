//! Common test utilities
//!
//! Scripted fetcher and classifier doubles that record how they were called.

#![allow(dead_code)]

use async_trait::async_trait;
use blogscout::error::{ClassifyError, FetchError};
use blogscout::feed::FeedFetcher;
use blogscout::llm::{ClassifyOptions, Classifier};
use blogscout::models::{FeedItem, ParsedFeed, RelevanceVerdict};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Epoch milliseconds for a UTC date at midnight
pub fn millis(y: i32, m: u32, d: u32) -> i64 {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .unwrap()
        .timestamp_millis()
}

/// Feed with one recent post per title
pub fn feed_with_posts(title: &str, posts: &[(&str, &str)]) -> ParsedFeed {
    ParsedFeed {
        title: Some(title.to_string()),
        description: None,
        items: posts
            .iter()
            .enumerate()
            .map(|(i, (post_title, published_at))| {
                FeedItem::new(*post_title, format!("https://example.com/{i}"))
                    .with_description(format!("Body of {post_title}"))
                    .with_published_at(*published_at)
            })
            .collect(),
    }
}

/// Relevant verdict whose reason carries a default topic keyword
pub fn rust_verdict() -> RelevanceVerdict {
    RelevanceVerdict {
        relevant: true,
        confidence: Some(0.9),
        reason: Some("Discusses Rust ownership".to_string()),
        tags: vec!["rust".to_string()],
        raw_response: "{}".to_string(),
    }
}

/// Verdict the classifier marks relevant without any topic signal
pub fn surface_verdict() -> RelevanceVerdict {
    RelevanceVerdict {
        relevant: true,
        confidence: Some(0.7),
        reason: Some("Mentions a charting library".to_string()),
        tags: vec!["charts".to_string()],
        raw_response: "{}".to_string(),
    }
}

pub fn not_relevant_verdict() -> RelevanceVerdict {
    RelevanceVerdict {
        relevant: false,
        confidence: Some(0.8),
        reason: Some("About gardening".to_string()),
        tags: Vec::new(),
        raw_response: "{}".to_string(),
    }
}

/// Tracks concurrent calls
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

enum Scripted {
    Feed(ParsedFeed),
    Error(String),
}

/// Feed fetcher returning scripted feeds after a delay
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, Scripted>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<Vec<String>>,
    pub in_flight: InFlight,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, feed: ParsedFeed) -> Self {
        self.responses.insert(url.to_string(), Scripted::Feed(feed));
        self
    }

    /// Fail `url` with a parse error carrying `message`
    pub fn with_error(mut self, url: &str, message: &str) -> Self {
        self.responses
            .insert(url.to_string(), Scripted::Error(message.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_delay_for(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl FeedFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.in_flight.enter();

        let delay = self.delays.get(url).copied().unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;
        self.in_flight.exit();

        match self.responses.get(url) {
            Some(Scripted::Feed(feed)) => Ok(feed.clone()),
            Some(Scripted::Error(message)) => Err(FetchError::Parse(message.clone())),
            None => Ok(feed_with_posts(url, &[])),
        }
    }
}

/// Classifier returning a verdict chosen by post title
pub struct MockClassifier {
    verdicts: HashMap<String, RelevanceVerdict>,
    fallback: RelevanceVerdict,
    failing: Vec<String>,
    delay: Duration,
    texts: Mutex<Vec<String>>,
    options: Mutex<Vec<ClassifyOptions>>,
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self {
            verdicts: HashMap::new(),
            fallback: not_relevant_verdict(),
            failing: Vec::new(),
            delay: Duration::ZERO,
            texts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `verdict` for texts starting with `title`
    pub fn with_verdict(mut self, title: &str, verdict: RelevanceVerdict) -> Self {
        self.verdicts.insert(title.to_string(), verdict);
        self
    }

    /// Verdict for every unscripted text
    pub fn with_fallback(mut self, verdict: RelevanceVerdict) -> Self {
        self.fallback = verdict;
        self
    }

    /// Fail hard (ignoring graceful mode) for texts starting with `title`
    pub fn failing_on(mut self, title: &str) -> Self {
        self.failing.push(title.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Texts the classifier was called with, in call order
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn options(&self) -> Vec<ClassifyOptions> {
        self.options.lock().unwrap().clone()
    }

    pub fn was_called_for(&self, title: &str) -> bool {
        self.texts().iter().any(|t| t.starts_with(title))
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(
        &self,
        text: &str,
        options: ClassifyOptions,
    ) -> Result<RelevanceVerdict, ClassifyError> {
        self.texts.lock().unwrap().push(text.to_string());
        self.options.lock().unwrap().push(options);
        tokio::time::sleep(self.delay).await;

        if self.failing.iter().any(|t| text.starts_with(t.as_str())) {
            return Err(ClassifyError::EmptyResponse);
        }

        let verdict = self
            .verdicts
            .iter()
            .find(|(title, _)| text.starts_with(title.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.fallback.clone());
        Ok(verdict)
    }
}

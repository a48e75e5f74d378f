//! blogscout - Blog feed scanner with local LLM relevance classification
//!
//! Fetches a directory of blog feeds, keeps the posts published inside a
//! recency window and asks a local Ollama model whether each one is about a
//! topic of interest.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`analyzer`] - Feed analysis orchestrator, bounded pool and single-flight cache
//! - [`feed`] - Feed fetching and RSS/Atom/JSON Feed parsing
//! - [`llm`] - Relevance classification client and verdict parser
//! - [`blogs`] - Blog directory loading and validation
//! - [`report`] - JSON, CSV and Markdown reports
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blogscout::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let analyzer = FeedAnalyzer::new(Arc::new(HttpFeedFetcher::new(&config.fetcher)?))
//!         .with_classifier(Arc::new(OllamaClassifier::new(&config.llm, &config.filter.topic)?))
//!         .with_guard(FalsePositiveGuard::new(&config.filter));
//!
//!     let urls = vec!["https://this-week-in-rust.org/rss.xml".to_string()];
//!     let options = AnalyzeOptions::from(&config.analyzer)
//!         .on_progress(|p| eprintln!("[{}/{}] {}", p.completed, p.total, p.feed_url));
//!
//!     let results = analyzer.analyze(&urls, &options).await?;
//!     println!("{} feeds analyzed", results.len());
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod blogs;
pub mod config;
pub mod error;
pub mod feed;
pub mod llm;
pub mod models;
pub mod report;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analyzer::{
        AnalyzeOptions, Cancellation, FalsePositiveGuard, FeedAnalyzer, ProgressUpdate,
        VerboseEvent,
    };
    pub use crate::blogs::BlogDirectory;
    pub use crate::config::Config;
    pub use crate::error::{AnalyzeError, Error, ErrorCategory, FeedError, Result};
    pub use crate::feed::{FeedFetcher, HttpFeedFetcher};
    pub use crate::llm::{Classifier, ClassifyOptions, OllamaClassifier};
    pub use crate::models::{FeedAnalysisResult, FeedStatus, ParsedFeed, RelevanceVerdict};
    pub use crate::report::{Report, ReportFormat};
}

// Direct re-exports for convenience
pub use analyzer::{AnalyzeOptions, FeedAnalyzer};
pub use models::{FeedAnalysisResult, FeedItem, ParsedFeed, RelevanceVerdict, RelevantPost};

//! Unified error handling for the blogscout crate
//!
//! Domain errors live next to the code that raises them. This module adds
//! the error types the analyzer and the report writer produce:
//!
//! - [`FeedError`] - a per-feed failure, attached to a rejected result
//! - [`AnalyzeError`] - a run-wide failure that aborts the whole analysis
//! - [`Error`] - failures while rendering or writing a report
//!
//! # Usage
//!
//! ```rust,ignore
//! use blogscout::error::{ErrorCategory, FeedError};
//!
//! fn describe(err: &FeedError) -> String {
//!     match err.category() {
//!         ErrorCategory::Network => format!("unreachable: {err}"),
//!         other => format!("{}: {err}", other.as_str()),
//!     }
//! }
//! ```

use std::io;
use std::sync::Arc;
use thiserror::Error;

pub use crate::utils::error::{ClassifyError, FetchError, VerdictParseError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Feed body could not be decoded or parsed
    Parsing,
    /// LLM classification errors
    Llm,
    /// Bad input such as an unparseable feed URL
    Config,
}

impl ErrorCategory {
    /// Short human-readable label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Llm => "llm",
            Self::Config => "config",
        }
    }
}

/// Failure of a single feed's unit of work
///
/// Both variants hold an `Arc` so that duplicate feed URLs, which share one
/// fetch, also share one error value.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    /// Fetching or parsing the feed failed
    #[error(transparent)]
    Fetch(Arc<FetchError>),

    /// The classifier failed on one of the feed's posts
    #[error(transparent)]
    Classify(Arc<ClassifyError>),
}

impl FeedError {
    /// Category used by the CLI when rendering failures
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => fetch_category(e),
            Self::Classify(_) => ErrorCategory::Llm,
        }
    }
}

impl From<FetchError> for FeedError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(Arc::new(err))
    }
}

impl From<ClassifyError> for FeedError {
    fn from(err: ClassifyError) -> Self {
        Self::Classify(Arc::new(err))
    }
}

/// Run-wide failures of [`crate::analyzer::FeedAnalyzer::analyze`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    /// Concurrency ceiling must be a positive integer
    #[error("concurrency must be a positive integer, got {0}")]
    InvalidConcurrency(usize),

    /// Month window must be a positive integer
    #[error("months must be a positive integer, got {0}")]
    InvalidMonthWindow(u32),

    /// Per-post text limit must be a positive integer
    #[error("max_text_chars must be a positive integer, got {0}")]
    InvalidTextLimit(usize),

    /// No classifier was supplied to the analyzer
    #[error("no classifier configured: supply one with FeedAnalyzer::with_classifier")]
    MissingClassifier,

    /// Run was cancelled through its cancellation signal
    #[error("analysis cancelled: {reason}")]
    Cancelled { reason: String },
}

impl AnalyzeError {
    /// Check if this is a configuration error raised before any work started
    pub fn is_config(&self) -> bool {
        !matches!(self, Self::Cancelled { .. })
    }
}

/// Report rendering and writing errors
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Report template errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

fn fetch_category(err: &FetchError) -> ErrorCategory {
    match err {
        FetchError::Parse(_) | FetchError::Decode(_) => ErrorCategory::Parsing,
        FetchError::InvalidUrl(_) => ErrorCategory::Config,
        _ => ErrorCategory::Network,
    }
}

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, Error>;

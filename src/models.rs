// Core data structures for blogscout

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::FeedError;

/// A fetched and parsed feed
///
/// Produced once per distinct URL and shared (behind an `Arc`) by every
/// result that requested the same URL.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Vec<FeedItem>,
}

/// A single post of a feed
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub published_at: Option<String>, // RFC 3339 or any format accepted by the cutoff parser
}

impl FeedItem {
    /// Create an item with a title and link only
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the publish date string
    #[must_use]
    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.published_at = Some(published_at.into());
        self
    }

    /// Description text if it carries anything besides whitespace
    pub fn body_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// The classifier's judgment for one post
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceVerdict {
    pub relevant: bool,
    pub confidence: Option<f32>, // 0.0 - 1.0
    pub reason: Option<String>,
    pub tags: Vec<String>, // at most 3, lowercase
    pub raw_response: String,
}

impl RelevanceVerdict {
    /// Maximum number of tags kept on a verdict
    pub const MAX_TAGS: usize = 3;

    /// Low-confidence "not relevant" verdict substituted for a failed call
    pub fn degraded(reason: impl std::fmt::Display) -> Self {
        Self {
            relevant: false,
            confidence: Some(0.0),
            reason: Some(format!("classification failed: {reason}")),
            tags: Vec::new(),
            raw_response: String::new(),
        }
    }

    /// Lowercase, trim, deduplicate and cap tags
    pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::with_capacity(Self::MAX_TAGS);
        for tag in tags {
            let tag = tag.as_ref().trim().trim_start_matches('#').to_lowercase();
            if tag.is_empty() || out.contains(&tag) {
                continue;
            }
            out.push(tag);
            if out.len() == Self::MAX_TAGS {
                break;
            }
        }
        out
    }
}

/// A post the classifier marked relevant and the guard accepted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelevantPost {
    pub title: String,
    pub link: String,
    pub published_at: Option<String>,
    pub analysis: RelevanceVerdict,
}

/// Final status of one feed's unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Fulfilled,
    Rejected,
}

impl FeedStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }
}

/// Outcome of one feed's unit of work
///
/// A rejected outcome carries only its error; feed data and relevant posts
/// exist only on fulfilled outcomes.
#[derive(Debug, Clone)]
pub enum FeedOutcome {
    Fulfilled {
        feed: Arc<ParsedFeed>,
        analyzed_items: usize,
        relevant_posts: Vec<RelevantPost>,
    },
    Rejected {
        error: FeedError,
    },
}

/// Per-input-URL result of an analysis run
#[derive(Debug, Clone)]
pub struct FeedAnalysisResult {
    pub feed_url: String,
    pub duration_ms: Option<u64>,
    pub outcome: FeedOutcome,
}

impl FeedAnalysisResult {
    /// Result status
    pub fn status(&self) -> FeedStatus {
        match self.outcome {
            FeedOutcome::Fulfilled { .. } => FeedStatus::Fulfilled,
            FeedOutcome::Rejected { .. } => FeedStatus::Rejected,
        }
    }

    /// Parsed feed, when fulfilled
    pub fn feed(&self) -> Option<&Arc<ParsedFeed>> {
        match &self.outcome {
            FeedOutcome::Fulfilled { feed, .. } => Some(feed),
            FeedOutcome::Rejected { .. } => None,
        }
    }

    /// Failure, when rejected
    pub fn error(&self) -> Option<&FeedError> {
        match &self.outcome {
            FeedOutcome::Fulfilled { .. } => None,
            FeedOutcome::Rejected { error } => Some(error),
        }
    }

    /// Number of posts sent to the classifier, when fulfilled
    pub fn analyzed_items(&self) -> Option<usize> {
        match &self.outcome {
            FeedOutcome::Fulfilled { analyzed_items, .. } => Some(*analyzed_items),
            FeedOutcome::Rejected { .. } => None,
        }
    }

    /// Relevant posts, when fulfilled
    pub fn relevant_posts(&self) -> Option<&[RelevantPost]> {
        match &self.outcome {
            FeedOutcome::Fulfilled { relevant_posts, .. } => Some(relevant_posts),
            FeedOutcome::Rejected { .. } => None,
        }
    }

    /// Feed title, when fulfilled and present
    pub fn feed_title(&self) -> Option<&str> {
        self.feed().and_then(|feed| feed.title.as_deref())
    }
}

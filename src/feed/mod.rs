//! Feed fetching
//!
//! The analyzer only depends on the [`FeedFetcher`] trait. The production
//! implementation, [`HttpFeedFetcher`], downloads feeds over HTTP with rate
//! limiting and retries and parses RSS, Atom and JSON Feed documents.

pub mod fetcher;
pub mod parse;

use async_trait::async_trait;

use crate::models::ParsedFeed;
use crate::utils::error::FetchError;

pub use fetcher::HttpFeedFetcher;
pub use parse::parse_feed;

/// Source of parsed feeds
///
/// Implementations own their timeout policy. Items lacking a title or a link
/// must be dropped before the feed is returned.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse the feed at `url`
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError>;
}

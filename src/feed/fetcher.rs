//! HTTP feed fetcher with rate limiting and retries
//!
//! This module provides the production [`FeedFetcher`] with features including:
//! - Rate limiting with governor, shared by every fetch of a run
//! - Automatic retry with exponential backoff on transient failures
//! - Charset-aware body decoding
//! - RSS / Atom / JSON Feed parsing

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use std::num::NonZeroU32;
use url::Url;

use super::parse::{decode_body, parse_feed};
use super::FeedFetcher;
use crate::config::FetcherConfig;
use crate::models::ParsedFeed;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};

const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/feed+json, \
     application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8";

/// Feed fetcher backed by `reqwest`
pub struct HttpFeedFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Backoff policy for transient failures
    retry: RetryConfig,
}

impl HttpFeedFetcher {
    /// Create a new fetcher from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the HTTP client cannot be created
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(config.timeout())
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        let retry = RetryConfig::with_delays(config.max_retries, 500, 5_000).with_jitter(250);

        Ok(Self {
            client,
            rate_limiter,
            retry,
        })
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Perform a single request, without retries
    async fn fetch_once(&self, url: &Url) -> Result<ParsedFeed, FetchError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(url = %url, "Fetching feed");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_default();

        let bytes = response.bytes().await.map_err(classify_transport_error)?;
        let body = decode_body(&bytes, &content_type)?;

        parse_feed(&body)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        let parsed = validate_url(url)?;

        let feed = with_retry_if(
            &self.retry,
            || self.fetch_once(&parsed),
            FetchError::is_recoverable,
        )
        .await?;

        tracing::debug!(url = %url, items = feed.items.len(), "Fetched feed");
        Ok(feed)
    }
}

fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!(
            "{raw}: unsupported scheme '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err)
    }
}

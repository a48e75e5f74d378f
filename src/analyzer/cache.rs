//! Single-flight feed cache
//!
//! One analysis run shares a [`FetchCache`] across all of its workers. The
//! first request for a URL installs a shared pending fetch before anything is
//! awaited; every later request for the same URL, concurrent or not, awaits
//! that same future and receives the same feed or the same error.
//!
//! # Example
//!
//! ```rust,ignore
//! use blogscout::analyzer::cache::FetchCache;
//!
//! let cache = FetchCache::new(fetcher);
//! let (a, b) = tokio::join!(cache.get("https://x/feed"), cache.get("https://x/feed"));
//! assert!(std::sync::Arc::ptr_eq(&a?, &b?));
//! ```

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::feed::FeedFetcher;
use crate::models::ParsedFeed;
use crate::utils::error::FetchError;

/// Outcome of one fetch, shareable between duplicate requests
pub type FetchOutcome = Result<Arc<ParsedFeed>, Arc<FetchError>>;

type PendingFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// Per-run map from feed URL to its in-flight or completed fetch
pub struct FetchCache {
    fetcher: Arc<dyn FeedFetcher>,
    entries: Mutex<HashMap<String, PendingFetch>>,
}

impl FetchCache {
    /// Create an empty cache over `fetcher`
    pub fn new(fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch `url`, joining an existing fetch of the same URL if there is one
    pub async fn get(&self, url: &str) -> FetchOutcome {
        let pending = self.pending(url);
        pending.await
    }

    /// Look up or install the shared fetch for `url`
    ///
    /// Runs entirely under the lock and never awaits, so two workers cannot
    /// both miss for the same URL.
    fn pending(&self, url: &str) -> PendingFetch {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.get(url) {
            tracing::debug!(url = %url, "Joining cached fetch");
            return existing.clone();
        }

        let fetcher = Arc::clone(&self.fetcher);
        let owned_url = url.to_string();
        let fetch = async move {
            fetcher
                .fetch(&owned_url)
                .await
                .map(Arc::new)
                .map_err(Arc::new)
        }
        .boxed()
        .shared();

        entries.insert(url.to_string(), fetch.clone());
        fetch
    }

    /// Number of distinct URLs requested so far
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if no URL has been requested yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

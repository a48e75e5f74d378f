//! Blog directory loading
//!
//! The directory is a JSON file holding either an array of entries or an
//! object with a `blogs` array:
//!
//! ```json
//! { "blogs": [
//!     { "name": "Inside Rust", "url": "https://blog.rust-lang.org/inside-rust/",
//!       "feed": "https://blog.rust-lang.org/inside-rust/feed.xml", "tags": ["rust"] }
//! ] }
//! ```
//!
//! Invalid entries are skipped with a warning; a directory with no valid
//! entry is a configuration error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::is_http_url;

/// One blog of the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogEntry {
    pub name: String,
    pub url: String,
    #[serde(default, alias = "rss", skip_serializing_if = "Option::is_none")]
    pub feed: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl BlogEntry {
    /// URL to fetch: the feed URL, falling back to the site URL
    pub fn feed_url(&self) -> &str {
        self.feed
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| self.url.trim())
    }

    /// Validate the entry, returning the problem if there is one
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is empty".to_string());
        }
        let feed_url = self.feed_url();
        if !is_http_url(feed_url) {
            return Err(format!("feed URL is not http(s): '{feed_url}'"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DirectoryFile {
    List(Vec<serde_json::Value>),
    Wrapped { blogs: Vec<serde_json::Value> },
}

/// An entry that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub index: usize,
    pub reason: String,
}

/// Validated blog directory
#[derive(Debug, Clone, Default)]
pub struct BlogDirectory {
    entries: Vec<BlogEntry>,
    skipped: Vec<SkippedEntry>,
}

impl BlogDirectory {
    /// Load and validate a directory file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read blog directory: {}", path.display()))?;

        let directory = Self::from_json(&content)
            .with_context(|| format!("Invalid blog directory: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            blogs = directory.len(),
            skipped = directory.skipped.len(),
            "Loaded blog directory"
        );

        Ok(directory)
    }

    /// Parse and validate a directory from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let file: DirectoryFile =
            serde_json::from_str(content).context("expected a JSON array or an object with a 'blogs' array")?;

        let raw = match file {
            DirectoryFile::List(items) | DirectoryFile::Wrapped { blogs: items } => items,
        };

        let mut entries = Vec::with_capacity(raw.len());
        let mut skipped = Vec::new();

        for (index, value) in raw.into_iter().enumerate() {
            let checked = serde_json::from_value::<BlogEntry>(value)
                .map_err(|e| e.to_string())
                .and_then(|entry| entry.validate().map(|()| entry));

            match checked {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    tracing::warn!(index, reason = %reason, "Skipping invalid blog entry");
                    skipped.push(SkippedEntry { index, reason });
                }
            }
        }

        if entries.is_empty() {
            anyhow::bail!("no valid blog entries ({} skipped)", skipped.len());
        }

        Ok(Self { entries, skipped })
    }

    /// Valid entries in file order
    pub fn entries(&self) -> &[BlogEntry] {
        &self.entries
    }

    /// Entries that failed validation
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    /// Feed URLs in file order, duplicates preserved
    pub fn feed_urls(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.feed_url().to_string()).collect()
    }

    /// Name of the first blog whose feed URL is `feed_url`
    pub fn name_for(&self, feed_url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.feed_url() == feed_url)
            .map(|e| e.name.as_str())
    }

    /// Number of valid entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no valid entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Strip HTML tags, decode entities and collapse whitespace
///
/// Feed descriptions are frequently HTML fragments; the classifier and the
/// reports only need their text.
pub fn strip_html(html: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    static BLOCK_RE: OnceLock<Regex> = OnceLock::new();

    let block_re = BLOCK_RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("Invalid regex pattern")
    });
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex pattern"));

    let without_blocks = block_re.replace_all(html, " ");
    let without_tags = tag_re.replace_all(&without_blocks, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);

    normalize_whitespace(&decoded)
}

/// Truncate text to a maximum number of characters
///
/// Counts `char`s rather than bytes so multi-byte text is never split
/// inside a code point. The result never exceeds `max_chars`; limits too
/// small to fit the `...` marker get a plain cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else if max_chars < 3 {
        text.chars().take(max_chars).collect()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Check that a string is an absolute http(s) URL
pub fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

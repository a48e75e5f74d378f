//! Feed document parsing
//!
//! Maps `feed-rs` documents (RSS 0.9x/1.0/2.0, Atom, JSON Feed) onto the
//! crate's [`ParsedFeed`] model.

use chrono::SecondsFormat;
use encoding_rs::{Encoding, UTF_8};
use feed_rs::model::{Entry, Feed, Link};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::models::{FeedItem, ParsedFeed};
use crate::utils::error::FetchError;
use crate::utils::{normalize_whitespace, strip_html};

/// Parse a feed document into a [`ParsedFeed`]
///
/// Entries without a title or a link are dropped.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, FetchError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(convert_feed(feed))
}

/// Decode a response body to UTF-8 bytes using the `Content-Type` charset
///
/// Bodies without a charset, or declared UTF-8, pass through untouched so the
/// XML parser can honour the document's own encoding declaration. When the
/// body is transcoded, the prolog's `encoding` attribute is rewritten to
/// match.
pub fn decode_body<'a>(bytes: &'a [u8], content_type: &str) -> Result<Cow<'a, [u8]>, FetchError> {
    let Some(label) = charset_from_content_type(content_type) else {
        return Ok(Cow::Borrowed(bytes));
    };

    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| FetchError::Decode(format!("unknown charset: {label}")))?;

    if encoding == UTF_8 {
        return Ok(Cow::Borrowed(bytes));
    }

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FetchError::Decode(format!(
            "body is not valid {}",
            encoding.name()
        )));
    }

    Ok(Cow::Owned(rewrite_xml_encoding(&text).into_bytes()))
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

fn rewrite_xml_encoding(text: &str) -> String {
    static PROLOG_RE: OnceLock<Regex> = OnceLock::new();

    let re = PROLOG_RE.get_or_init(|| {
        Regex::new(r#"^(\s*<\?xml[^>]*?encoding\s*=\s*)["'][^"']*["']"#)
            .expect("Invalid regex pattern")
    });

    re.replace(text, r#"${1}"UTF-8""#).into_owned()
}

fn convert_feed(feed: Feed) -> ParsedFeed {
    let title = feed
        .title
        .map(|t| normalize_whitespace(&t.content))
        .filter(|t| !t.is_empty());
    let description = feed
        .description
        .map(|d| strip_html(&d.content))
        .filter(|d| !d.is_empty());

    let total = feed.entries.len();
    let items: Vec<FeedItem> = feed.entries.into_iter().filter_map(convert_entry).collect();

    if items.len() < total {
        tracing::debug!(
            dropped = total - items.len(),
            kept = items.len(),
            "Dropped feed entries without title or link"
        );
    }

    ParsedFeed {
        title,
        description,
        items,
    }
}

fn convert_entry(entry: Entry) -> Option<FeedItem> {
    let title = entry
        .title
        .as_ref()
        .map(|t| strip_html(&t.content))
        .filter(|t| !t.is_empty())?;
    let link = pick_link(&entry.links)?;

    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
        .or_else(|| {
            entry
                .media
                .iter()
                .find_map(|m| m.description.as_ref().map(|d| d.content.clone()))
        })
        .map(|raw| strip_html(&raw))
        .filter(|text| !text.is_empty());

    let published_at = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true));

    Some(FeedItem {
        title,
        link,
        description,
        published_at,
    })
}

fn pick_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

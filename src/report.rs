//! Report rendering
//!
//! Turns the analyzer's results into a [`Report`] and renders it as JSON,
//! CSV (one row per relevant post) or Markdown via a Handlebars template.

use chrono::{DateTime, SecondsFormat, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::blogs::BlogDirectory;
use crate::error::{Error, Result};
use crate::models::{FeedAnalysisResult, FeedStatus, RelevantPost};
use crate::utils::normalize_whitespace;

/// Default Markdown template
const DEFAULT_TEMPLATE: &str = include_str!("../templates/report.hbs");

const CSV_HEADER: [&str; 8] = [
    "blog_title",
    "feed_url",
    "post_title",
    "link",
    "published_at",
    "confidence",
    "tags",
    "reason",
];

// ============================================================================
// Report model
// ============================================================================

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(format!("unknown report format '{other}' (expected json, csv or markdown)")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Markdown => "markdown",
        })
    }
}

/// Run-level information shown at the top of a report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub topic: String,
    pub months: u32,
    pub cutoff: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Aggregate counts over all feeds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub feeds: usize,
    pub fulfilled: usize,
    pub rejected: usize,
    pub analyzed_items: usize,
    pub relevant_posts: usize,
}

/// One feed's entry in the report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedReport {
    pub feed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_title: Option<String>,
    pub status: FeedStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relevant_posts: Vec<RelevantPost>,
}

impl FeedReport {
    /// Name shown for the feed: blog name, feed title or URL
    pub fn display_name(&self) -> &str {
        self.blog_name
            .as_deref()
            .or(self.feed_title.as_deref())
            .unwrap_or(&self.feed_url)
    }
}

/// Complete analysis report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub metadata: ReportMetadata,
    pub totals: ReportTotals,
    pub feeds: Vec<FeedReport>,
}

impl Report {
    /// Build a report from analyzer results, in result order
    pub fn new(
        metadata: ReportMetadata,
        results: &[FeedAnalysisResult],
        directory: Option<&BlogDirectory>,
    ) -> Self {
        let feeds: Vec<FeedReport> = results
            .iter()
            .map(|result| FeedReport {
                feed_url: result.feed_url.clone(),
                blog_name: directory
                    .and_then(|d| d.name_for(&result.feed_url))
                    .map(str::to_string),
                feed_title: result.feed_title().map(str::to_string),
                status: result.status(),
                duration_ms: result.duration_ms,
                analyzed_items: result.analyzed_items(),
                error: result.error().map(ToString::to_string),
                error_category: result.error().map(|e| e.category().as_str()),
                relevant_posts: result.relevant_posts().map(<[_]>::to_vec).unwrap_or_default(),
            })
            .collect();

        let rejected = feeds
            .iter()
            .filter(|f| f.status == FeedStatus::Rejected)
            .count();
        let totals = ReportTotals {
            feeds: feeds.len(),
            fulfilled: feeds.len() - rejected,
            rejected,
            analyzed_items: feeds.iter().filter_map(|f| f.analyzed_items).sum(),
            relevant_posts: feeds.iter().map(|f| f.relevant_posts.len()).sum(),
        };

        Self {
            metadata,
            totals,
            feeds,
        }
    }

    /// Render in `format`
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => self.to_json(),
            ReportFormat::Csv => Ok(self.to_csv()),
            ReportFormat::Markdown => self.to_markdown(),
        }
    }

    /// Render and write to `path`
    pub fn write_to(&self, path: &Path, format: ReportFormat) -> Result<()> {
        let rendered = self.render(format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, rendered)?;
        tracing::info!(path = %path.display(), format = %format, "Report written");
        Ok(())
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// CSV with one row per relevant post
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_row(&mut out, CSV_HEADER);

        for feed in &self.feeds {
            for post in &feed.relevant_posts {
                let confidence = post
                    .analysis
                    .confidence
                    .map(|c| format!("{c:.2}"))
                    .unwrap_or_default();
                let tags = post.analysis.tags.join(";");
                push_csv_row(
                    &mut out,
                    [
                        feed.blog_name
                            .as_deref()
                            .or(feed.feed_title.as_deref())
                            .unwrap_or_default(),
                        feed.feed_url.as_str(),
                        post.title.as_str(),
                        post.link.as_str(),
                        post.published_at.as_deref().unwrap_or_default(),
                        confidence.as_str(),
                        tags.as_str(),
                        post.analysis.reason.as_deref().unwrap_or_default(),
                    ],
                );
            }
        }

        out
    }

    /// Markdown rendered with the built-in template
    pub fn to_markdown(&self) -> Result<String> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string("report", DEFAULT_TEMPLATE)
            .map_err(|e| Error::with_source("Failed to register report template", e))?;

        Ok(handlebars.render("report", &MarkdownData::from(self))?)
    }
}

// ============================================================================
// CSV
// ============================================================================

fn push_csv_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&csv_field(field));
    }
    out.push_str("\r\n");
}

/// Quote a field when it contains a delimiter, quote or line break
fn csv_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

// ============================================================================
// Markdown template data
// ============================================================================

#[derive(Serialize)]
struct MarkdownData<'a> {
    topic: &'a str,
    months: u32,
    cutoff: String,
    generated_at: String,
    totals: TotalsData,
    sections: Vec<SectionData<'a>>,
    failures: Vec<FailureData<'a>>,
}

#[derive(Serialize)]
struct TotalsData {
    feeds: usize,
    fulfilled: usize,
    rejected: usize,
    analyzed_items: usize,
    relevant_posts: usize,
}

#[derive(Serialize)]
struct SectionData<'a> {
    name: &'a str,
    feed_url: &'a str,
    posts: Vec<PostData<'a>>,
}

#[derive(Serialize)]
struct PostData<'a> {
    title: String,
    link: String,
    published_at: Option<&'a str>,
    confidence: Option<String>,
    tags: String,
    reason: Option<String>,
}

#[derive(Serialize)]
struct FailureData<'a> {
    name: &'a str,
    feed_url: &'a str,
    error: &'a str,
}

impl<'a> From<&'a Report> for MarkdownData<'a> {
    fn from(report: &'a Report) -> Self {
        let totals = &report.totals;

        let sections = report
            .feeds
            .iter()
            .filter(|f| !f.relevant_posts.is_empty())
            .map(|f| SectionData {
                name: f.display_name(),
                feed_url: &f.feed_url,
                posts: f
                    .relevant_posts
                    .iter()
                    .map(|p| PostData {
                        title: link_text(&p.title),
                        link: link_target(&p.link),
                        published_at: p.published_at.as_deref(),
                        confidence: p.analysis.confidence.map(|c| format!("{c:.2}")),
                        tags: p.analysis.tags.join(", "),
                        reason: p
                            .analysis
                            .reason
                            .as_deref()
                            .map(normalize_whitespace)
                            .filter(|r| !r.is_empty()),
                    })
                    .collect(),
            })
            .collect();

        let failures = report
            .feeds
            .iter()
            .filter_map(|f| {
                f.error.as_deref().map(|error| FailureData {
                    name: f.display_name(),
                    feed_url: &f.feed_url,
                    error,
                })
            })
            .collect();

        Self {
            topic: &report.metadata.topic,
            months: report.metadata.months,
            cutoff: report
                .metadata
                .cutoff
                .map_or_else(|| "unknown".to_string(), |c| c.format("%Y-%m-%d").to_string()),
            generated_at: report
                .metadata
                .generated_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            totals: TotalsData {
                feeds: totals.feeds,
                fulfilled: totals.fulfilled,
                rejected: totals.rejected,
                analyzed_items: totals.analyzed_items,
                relevant_posts: totals.relevant_posts,
            },
            sections,
            failures,
        }
    }
}

/// Title as Markdown link text: one line, brackets escaped
fn link_text(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in normalize_whitespace(title).chars() {
        if matches!(c, '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// URL as a Markdown link destination
fn link_target(link: &str) -> String {
    link.trim()
        .replace(' ', "%20")
        .replace('(', "%28")
        .replace(')', "%29")
}

//! Blog directory to report, end to end, with scripted feeds

mod common;

use blogscout::analyzer::cutoff::cutoff_from_millis;
use blogscout::analyzer::{fixed_clock, AnalyzeOptions, FeedAnalyzer};
use blogscout::blogs::BlogDirectory;
use blogscout::report::{Report, ReportFormat, ReportMetadata};
use chrono::{TimeZone, Utc};
use common::*;
use std::path::Path;
use std::sync::Arc;

const RUST_BLOG: &str = "https://blog.rust-lang.org/feed.xml";
const TWIR: &str = "https://this-week-in-rust.org/rss.xml";
const TOKIO: &str = "https://tokio.rs/blog/index.xml";

async fn build_report() -> Report {
    let directory = BlogDirectory::load(Path::new("blogs.example.json")).unwrap();
    assert_eq!(directory.len(), 3);
    assert_eq!(directory.skipped().len(), 1);

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_feed(
                RUST_BLOG,
                feed_with_posts(
                    "Rust Blog",
                    &[
                        ("Announcing Rust 1.91", "2025-10-30T00:00:00Z"),
                        ("Survey results", "2025-10-01T00:00:00Z"),
                        ("Ancient news", "2023-01-01T00:00:00Z"),
                    ],
                ),
            )
            .with_feed(TWIR, feed_with_posts("TWiR", &[("Issue 600", "2025-11-26T00:00:00Z")]))
            .with_error(TOKIO, "unexpected end of document"),
    );
    let classifier = Arc::new(
        MockClassifier::new()
            .with_verdict("Announcing", rust_verdict())
            .with_verdict("Issue 600", surface_verdict()),
    );

    let now = Utc.with_ymd_and_hms(2025, 12, 5, 0, 0, 0).unwrap();
    let results = FeedAnalyzer::new(fetcher)
        .with_classifier(classifier)
        .analyze(
            &directory.feed_urls(),
            &AnalyzeOptions::default()
                .with_clock(fixed_clock(now.timestamp_millis()))
                .with_months(3),
        )
        .await
        .unwrap();

    let metadata = ReportMetadata {
        topic: "Rust".to_string(),
        months: 3,
        cutoff: cutoff_from_millis(now.timestamp_millis(), 3),
        generated_at: now,
        model: Some("test-model".to_string()),
    };
    Report::new(metadata, &results, Some(&directory))
}

#[tokio::test]
async fn test_report_totals() {
    let report = build_report().await;

    assert_eq!(report.totals.feeds, 3);
    assert_eq!(report.totals.fulfilled, 2);
    assert_eq!(report.totals.rejected, 1);
    assert_eq!(report.totals.analyzed_items, 3);
    assert_eq!(report.totals.relevant_posts, 1);

    let names: Vec<_> = report.feeds.iter().map(|f| f.display_name()).collect();
    assert_eq!(names, vec!["Rust Blog", "This Week in Rust", "Tokio"]);
}

#[tokio::test]
async fn test_report_files() {
    let report = build_report().await;
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("out/report.json");
    let format = ReportFormat::from_path(&json_path).unwrap();
    report.write_to(&json_path, format).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["metadata"]["months"], 3);
    assert_eq!(json["feeds"][0]["relevantPosts"][0]["title"], "Announcing Rust 1.91");
    assert_eq!(json["feeds"][2]["status"], "rejected");
    assert!(json["feeds"][2]["error"]
        .as_str()
        .unwrap()
        .contains("unexpected end of document"));

    let csv_path = dir.path().join("report.csv");
    report.write_to(&csv_path, ReportFormat::Csv).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("Announcing Rust 1.91"));
    assert!(!csv.contains("Issue 600"));

    let md_path = dir.path().join("report.md");
    report.write_to(&md_path, ReportFormat::Markdown).unwrap();
    let md = std::fs::read_to_string(&md_path).unwrap();
    assert!(md.contains("# Blog scan: Rust"));
    assert!(md.contains("### Rust Blog"));
    assert!(md.contains("[Announcing Rust 1.91](https://example.com/0)"));
    assert!(md.contains("## Failed feeds"));
    assert!(md.contains("Tokio <https://tokio.rs/blog/index.xml>"));
}

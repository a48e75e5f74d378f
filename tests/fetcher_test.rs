//! Integration tests for HttpFeedFetcher using wiremock
//!
//! These tests validate the HTTP fetcher's behavior with mock servers.

use blogscout::config::FetcherConfig;
use blogscout::error::FetchError;
use blogscout::feed::{FeedFetcher, HttpFeedFetcher};
use blogscout::utils::retry::RetryConfig;
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Mock Blog</title>
    <link>https://mock.example</link>
    <description>Testing feed</description>
    <item>
      <title>Ownership in practice</title>
      <link>https://mock.example/ownership</link>
      <description>&lt;p&gt;Borrowing &lt;b&gt;rules&lt;/b&gt;&lt;/p&gt;</description>
      <pubDate>Sat, 01 Nov 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Untitled link</title>
    </item>
  </channel>
</rss>"#;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Blog</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2025-11-02T00:00:00Z</updated>
  <entry>
    <title>Async traits</title>
    <link href="https://atom.example/async"/>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2025-11-02T08:30:00Z</updated>
    <summary>Notes on async fn in traits</summary>
  </entry>
</feed>"#;

/// Fetcher with fast, jitter-free retries
fn fetcher(max_retries: u32) -> HttpFeedFetcher {
    let config = FetcherConfig {
        timeout_secs: 5,
        requests_per_second: 100,
        max_retries,
        ..Default::default()
    };
    HttpFeedFetcher::new(&config)
        .unwrap()
        .with_retry(RetryConfig::with_delays(max_retries, 1, 5))
}

/// Test successful RSS fetch from mock server
#[tokio::test]
async fn test_fetch_rss_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml; charset=utf-8")
                .set_body_string(RSS),
        )
        .mount(&mock_server)
        .await;

    let feed = fetcher(0)
        .fetch(&format!("{}/rss.xml", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(feed.title.as_deref(), Some("Mock Blog"));
    assert_eq!(feed.items.len(), 1, "entry without link should be dropped");

    let item = &feed.items[0];
    assert_eq!(item.title, "Ownership in practice");
    assert_eq!(item.link, "https://mock.example/ownership");
    assert_eq!(item.body_text(), Some("Borrowing rules"));
    assert_eq!(item.published_at.as_deref(), Some("2025-11-01T10:00:00Z"));
}

/// Test Atom documents go through the same path
#[tokio::test]
async fn test_fetch_atom_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/atom.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ATOM))
        .mount(&mock_server)
        .await;

    let feed = fetcher(0)
        .fetch(&format!("{}/atom.xml", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(feed.title.as_deref(), Some("Atom Blog"));
    assert_eq!(feed.items[0].link, "https://atom.example/async");
    assert_eq!(feed.items[0].body_text(), Some("Notes on async fn in traits"));
    assert_eq!(feed.items[0].published_at.as_deref(), Some("2025-11-02T08:30:00Z"));
}

/// Test the fetcher asks for feed content types
#[tokio::test]
async fn test_sends_feed_accept_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .and(header_regex("accept", r"application/rss\+xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = fetcher(0)
        .fetch(&format!("{}/rss.xml", mock_server.uri()))
        .await;
    assert!(result.is_ok(), "Fetch should succeed: {:?}", result.err());
}

/// Test that server errors trigger retries
#[tokio::test]
async fn test_server_error_retry() {
    let mock_server = MockServer::start().await;

    // Return 500 twice, then succeed
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .mount(&mock_server)
        .await;

    let result = fetcher(2)
        .fetch(&format!("{}/feed", mock_server.uri()))
        .await;

    assert!(result.is_ok(), "Should succeed after retries: {:?}", result.err());
}

/// Test that retries stop after the configured count
#[tokio::test]
async fn test_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let result = fetcher(2)
        .fetch(&format!("{}/feed", mock_server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Status(503))));
}

/// Test 404 is returned without retry
#[tokio::test]
async fn test_not_found_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = fetcher(3)
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await;

    match result {
        Err(FetchError::Status(404)) => {}
        other => panic!("expected 404 status error, got {other:?}"),
    }
}

/// Test non-feed bodies fail as parse errors without retry
#[tokio::test]
async fn test_html_body_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body><p>Not a feed</p></body></html>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = fetcher(3)
        .fetch(&format!("{}/page", mock_server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Parse(_))), "got {result:?}");
}

/// Test bodies in a legacy charset are transcoded before parsing
#[tokio::test]
async fn test_legacy_charset_body() {
    let mock_server = MockServer::start().await;

    let xml = RSS
        .replace("encoding=\"UTF-8\"", "encoding=\"ISO-8859-1\"")
        .replace("Mock Blog", "Café Blog");
    let (body, _, _) = encoding_rs::WINDOWS_1252.encode(&xml);

    Mock::given(method("GET"))
        .and(path("/latin1.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml; charset=iso-8859-1")
                .set_body_bytes(body.into_owned()),
        )
        .mount(&mock_server)
        .await;

    let feed = fetcher(0)
        .fetch(&format!("{}/latin1.xml", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(feed.title.as_deref(), Some("Café Blog"));
}

/// Test unsupported schemes never reach the network
#[tokio::test]
async fn test_invalid_url() {
    let result = fetcher(3).fetch("ftp://example.com/feed.xml").await;
    assert!(matches!(result, Err(FetchError::InvalidUrl(_))));

    let result = fetcher(3).fetch("not a url").await;
    assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
}

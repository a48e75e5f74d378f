//! Integration tests for OllamaClassifier using wiremock

use blogscout::config::LlmConfig;
use blogscout::error::ClassifyError;
use blogscout::llm::{ClassifyOptions, Classifier, OllamaClassifier};
use blogscout::utils::retry::RetryConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn classifier(server: &MockServer, max_retries: u32) -> OllamaClassifier {
    let config = LlmConfig {
        endpoint: server.uri(),
        model: "test-model".to_string(),
        timeout_secs: 5,
        max_retries,
        ..Default::default()
    };
    OllamaClassifier::new(&config, "Rust programming")
        .unwrap()
        .with_retry(RetryConfig::with_delays(max_retries, 1, 5))
}

fn generate_reply(response: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "test-model",
        "response": response,
        "done": true
    }))
}

#[tokio::test]
async fn test_classify_structured_verdict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "stream": false,
            "format": "json"
        })))
        .respond_with(generate_reply(
            r#"{"relevant": true, "confidence": 0.92, "reason": "Explains the borrow checker", "tags": ["Rust", "Ownership"]}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let verdict = classifier(&mock_server, 0)
        .classify("Borrowing\n\nHow the borrow checker works", ClassifyOptions::default())
        .await
        .unwrap();

    assert!(verdict.relevant);
    assert_eq!(verdict.confidence, Some(0.92));
    assert_eq!(verdict.reason.as_deref(), Some("Explains the borrow checker"));
    assert_eq!(verdict.tags, vec!["rust", "ownership"]);
    assert!(verdict.raw_response.contains("borrow checker"));
}

#[tokio::test]
async fn test_classify_text_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(generate_reply("No, this post is about sourdough bread."))
        .mount(&mock_server)
        .await;

    let verdict = classifier(&mock_server, 0)
        .classify("Sourdough", ClassifyOptions::default())
        .await
        .unwrap();

    assert!(!verdict.relevant);
    assert!(verdict.tags.is_empty());
}

#[tokio::test]
async fn test_server_error_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(generate_reply(r#"{"relevant": false, "confidence": 0.1}"#))
        .mount(&mock_server)
        .await;

    let verdict = classifier(&mock_server, 2)
        .classify("text", ClassifyOptions::default())
        .await
        .unwrap();

    assert!(!verdict.relevant);
    assert_eq!(verdict.confidence, Some(0.1));
}

#[tokio::test]
async fn test_failure_without_graceful_mode() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let err = classifier(&mock_server, 1)
        .classify("text", ClassifyOptions::default())
        .await
        .unwrap_err();

    match err {
        ClassifyError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_graceful_mode_degrades() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let verdict = classifier(&mock_server, 0)
        .classify("text", ClassifyOptions::graceful())
        .await
        .unwrap();

    assert!(!verdict.relevant);
    assert_eq!(verdict.confidence, Some(0.0));
    assert!(verdict
        .reason
        .as_deref()
        .unwrap()
        .starts_with("classification failed: "));
}

#[tokio::test]
async fn test_missing_response_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = classifier(&mock_server, 3)
        .classify("text", ClassifyOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifyError::EmptyResponse));
}

#[tokio::test]
async fn test_unparseable_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(generate_reply("   "))
        .mount(&mock_server)
        .await;

    let err = classifier(&mock_server, 0)
        .classify("text", ClassifyOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifyError::Verdict(_)));
}

#[tokio::test]
async fn test_is_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&mock_server)
        .await;

    assert!(classifier(&mock_server, 0).is_available().await);
}

#[tokio::test]
async fn test_is_not_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    assert!(!classifier(&mock_server, 0).is_available().await);
}

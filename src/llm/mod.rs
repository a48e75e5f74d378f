//! LLM client for relevance classification
//!
//! This module provides the [`Classifier`] seam used by the analyzer and its
//! production implementation backed by a local Ollama server.

pub mod verdict;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::models::RelevanceVerdict;
use crate::utils::error::ClassifyError;
use crate::utils::retry::{with_retry_if, RetryConfig};

pub use verdict::parse_verdict;

/// Per-call classification options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Turn a final failure into [`RelevanceVerdict::degraded`] instead of
    /// returning the error
    pub graceful: bool,
}

impl ClassifyOptions {
    /// Options with graceful degradation enabled
    pub fn graceful() -> Self {
        Self { graceful: true }
    }
}

/// Judges whether a snippet of post text is relevant to the topic
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `text`
    ///
    /// Implementations own their retry and timeout policy.
    async fn classify(
        &self,
        text: &str,
        options: ClassifyOptions,
    ) -> Result<RelevanceVerdict, ClassifyError>;
}

/// Ollama generate request
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama generate response
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Relevance classifier backed by Ollama's `/api/generate`
pub struct OllamaClassifier {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    topic: String,
    retry: RetryConfig,
}

impl OllamaClassifier {
    /// Create a classifier for `topic`
    ///
    /// # Errors
    ///
    /// Returns `ClassifyError::Transport` if the HTTP client cannot be created
    pub fn new(config: &LlmConfig, topic: impl Into<String>) -> Result<Self, ClassifyError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            topic: topic.into(),
            retry: RetryConfig::with_delays(config.max_retries, 1_000, 10_000).with_jitter(250),
        })
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Model name used for generation
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if Ollama is available
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, endpoint = %self.endpoint, "Ollama probe failed");
                false
            }
        }
    }

    /// Build prompt for relevance classification
    fn build_prompt(&self, text: &str) -> String {
        format!(
            r#"You are screening blog posts for a reader interested in one topic.

Topic: {topic}

Decide whether the post below is substantially about the topic. A passing
mention, an analogy, or a similarly named product does not count.

Answer with a single JSON object and nothing else:
{{"relevant": true or false, "confidence": number between 0 and 1, "reason": "one sentence naming the topic signal you found", "tags": ["up to three lowercase keywords"]}}

Post:
{text}"#,
            topic = self.topic,
        )
    }

    /// Generate text using Ollama
    async fn generate(&self, prompt: &str) -> Result<String, ClassifyError> {
        let url = format!("{}/api/generate", self.endpoint);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: OllamaResponse = response.json().await.map_err(transport_error)?;
        body.response.ok_or(ClassifyError::EmptyResponse)
    }
}

#[async_trait]
impl Classifier for OllamaClassifier {
    async fn classify(
        &self,
        text: &str,
        options: ClassifyOptions,
    ) -> Result<RelevanceVerdict, ClassifyError> {
        let prompt = self.build_prompt(text);

        let result = with_retry_if(
            &self.retry,
            || self.generate(&prompt),
            ClassifyError::is_recoverable,
        )
        .await
        .and_then(|raw| parse_verdict(&raw).map_err(ClassifyError::from));

        match result {
            Ok(verdict) => Ok(verdict),
            Err(e) if options.graceful => {
                tracing::warn!(error = %e, model = %self.model, "Classification failed, degrading to not relevant");
                Ok(RelevanceVerdict::degraded(&e))
            }
            Err(e) => Err(e),
        }
    }
}

fn transport_error(err: reqwest::Error) -> ClassifyError {
    if err.is_timeout() {
        ClassifyError::Timeout
    } else {
        ClassifyError::Transport(err)
    }
}

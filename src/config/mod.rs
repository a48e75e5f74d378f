//! Configuration management for blogscout
//!
//! This module handles loading and validating configuration from defaults,
//! a TOML file and environment variables. Command-line flags are applied on
//! top by the binary.
//!
//! Precedence (lowest to highest): defaults, config file, environment, CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analyzer configuration
    pub analyzer: AnalyzerConfig,

    /// Feed fetcher configuration
    pub fetcher: FetcherConfig,

    /// LLM classification configuration
    pub llm: LlmConfig,

    /// Topic filter configuration
    pub filter: FilterConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Analyzer-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum number of feeds processed concurrently
    pub concurrency: usize,

    /// Recency window in calendar months
    pub months: u32,

    /// Maximum characters of post text sent to the classifier
    pub max_text_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            months: 3,
            max_text_chars: 4000,
        }
    }
}

/// Feed fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Rate limit (requests per second) shared by all fetches
    pub requests_per_second: u32,

    /// Maximum retries for transient failures
    pub max_retries: u32,

    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            requests_per_second: 5,
            max_retries: 2,
            user_agent: format!("blogscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetcherConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for the Ollama classification client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama endpoint URL (default: http://localhost:11434)
    pub endpoint: String,

    /// Model name to use
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 - 1.0)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Maximum retries for transient failures
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            timeout_secs: 60,
            temperature: 0.1,
            max_tokens: 512,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Topic of interest and the signal markers the false-positive guard checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Topic shown to the model
    pub topic: String,

    /// Topic-signal keywords; a relevant verdict must mention one of them
    pub keywords: Vec<String>,

    /// Phrases in a verdict's reason that contradict a relevant verdict
    pub reject_phrases: Vec<String>,

    /// Also look for keywords in the post's title and description
    pub check_item_text: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            topic: "Rust programming language, its ecosystem and tooling".to_string(),
            keywords: [
                "rust",
                "rustc",
                "cargo",
                "crate",
                "crates.io",
                "borrow checker",
                "ownership",
                "tokio",
                "async rust",
                "unsafe",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            reject_phrases: [
                "not related",
                "unrelated",
                "no mention of",
                "does not mention",
                "only mentions",
                "not about",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            check_item_text: false,
        }
    }
}

impl FilterConfig {
    /// Load a standalone filter file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter file: {}", path.display()))?;

        let filter: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML filter file: {}", path.display()))?;

        filter.validate()?;
        Ok(filter)
    }

    /// Validate filter values
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            anyhow::bail!("filter.topic must not be empty");
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            anyhow::bail!("filter.keywords must not contain empty entries");
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration: file (if given) then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides read through `lookup`
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = parsed(lookup("BLOGSCOUT_CONCURRENCY")) {
            self.analyzer.concurrency = v;
        }
        if let Some(v) = parsed(lookup("BLOGSCOUT_MONTHS")) {
            self.analyzer.months = v;
        }
        if let Some(v) = parsed(lookup("BLOGSCOUT_REQUEST_TIMEOUT")) {
            self.fetcher.timeout_secs = v;
        }
        if let Some(v) = parsed(lookup("BLOGSCOUT_RATE_LIMIT")) {
            self.fetcher.requests_per_second = v;
        }
        if let Some(v) = lookup("BLOGSCOUT_USER_AGENT") {
            self.fetcher.user_agent = v;
        }
        if let Some(v) = lookup("OLLAMA_ENDPOINT") {
            self.llm.endpoint = v;
        }
        if let Some(v) = lookup("OLLAMA_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = parsed(lookup("OLLAMA_TIMEOUT")) {
            self.llm.timeout_secs = v;
        }
        if let Some(v) = parsed(lookup("OLLAMA_TEMPERATURE")) {
            self.llm.temperature = v;
        }
        if let Some(v) = lookup("BLOGSCOUT_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("BLOGSCOUT_LOG_FORMAT") {
            self.logging.format = v;
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.analyzer.concurrency == 0 {
            anyhow::bail!("analyzer.concurrency must be greater than 0");
        }

        if self.analyzer.months == 0 {
            anyhow::bail!("analyzer.months must be greater than 0");
        }

        if self.analyzer.max_text_chars == 0 {
            anyhow::bail!("analyzer.max_text_chars must be greater than 0");
        }

        if self.fetcher.requests_per_second == 0 {
            anyhow::bail!("fetcher.requests_per_second must be greater than 0");
        }

        if !crate::utils::is_http_url(&self.llm.endpoint) {
            anyhow::bail!("llm.endpoint must be an http(s) URL: {}", self.llm.endpoint);
        }

        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }

        if !(0.0..=1.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be between 0.0 and 1.0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        self.filter.validate()
    }
}

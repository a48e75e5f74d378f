//! Error types for the feed fetcher and the classification client
//!
//! This module defines the typed errors returned by the two external
//! collaborators of the analyzer.

use thiserror::Error;

/// Errors that can occur while fetching and parsing a feed
#[derive(Error, Debug)]
pub enum FetchError {
    /// URL could not be parsed or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Server answered with a non-success status code
    #[error("HTTP error: status {0}")]
    Status(u16),

    /// Connection, TLS or body transfer failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body could not be decoded with the declared charset
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Body is not a valid RSS, Atom or JSON feed
    #[error("Feed parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Check if the fetcher should retry after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Status(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::InvalidUrl(_) | Self::Decode(_) | Self::Parse(_) => false,
        }
    }
}

/// Errors produced while turning a model response into a verdict
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerdictParseError {
    /// Model returned only whitespace
    #[error("model response is empty")]
    NoContent,

    /// Structured response carried a relevance flag that is not yes/no
    #[error("relevance flag is not a yes/no value: {0}")]
    InvalidFlag(String),

    /// Neither the structured nor the text path recognized the response
    #[error("unrecognized model response: {0}")]
    Unrecognized(String),
}

/// Errors that can occur while classifying a post
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Connection, TLS or body transfer failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Model service answered with a non-success status code
    #[error("LLM request failed: {status} - {body}")]
    Status { status: u16, body: String },

    /// Model service answered without a `response` field
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// Response text could not be turned into a verdict
    #[error("Verdict parse error: {0}")]
    Verdict(#[from] VerdictParseError),
}

impl ClassifyError {
    /// Check if the client should retry after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_decode(),
            Self::Timeout => true,
            Self::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::EmptyResponse | Self::Verdict(_) => false,
        }
    }
}

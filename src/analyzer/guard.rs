//! False-positive guard
//!
//! A rule-based second pass over relevant verdicts. The model sometimes says
//! "relevant" on surface wording alone; the guard only keeps a verdict whose
//! own reason or tags (and optionally the post text) carry a topic-signal
//! keyword, and drops verdicts whose reason contradicts the flag.

use regex::Regex;

use crate::config::FilterConfig;
use crate::models::{FeedItem, RelevanceVerdict};

/// Why the guard kept or dropped a verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Verdict was relevant and backed by this keyword, or no keywords are configured
    Accepted { keyword: Option<String> },
    /// Verdict was not relevant to begin with
    NotRelevant,
    /// Reason contains a phrase that contradicts the relevant flag
    Contradicted { phrase: String },
    /// No topic-signal keyword found
    NoSignal,
}

impl GuardDecision {
    /// Check if the verdict survives the guard
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

struct Keyword {
    text: String,
    pattern: Regex,
}

/// Deterministic filter applied to relevant verdicts
pub struct FalsePositiveGuard {
    keywords: Vec<Keyword>,
    reject_phrases: Vec<String>,
    check_item_text: bool,
}

impl FalsePositiveGuard {
    /// Build a guard from the filter configuration
    pub fn new(filter: &FilterConfig) -> Self {
        let keywords = filter
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .filter_map(|k| {
                let pattern = format!(r"(?i)(?:^|[^\w]){}(?:$|[^\w])", regex::escape(k));
                Regex::new(&pattern).ok().map(|pattern| Keyword {
                    text: k.to_lowercase(),
                    pattern,
                })
            })
            .collect();

        let reject_phrases = filter
            .reject_phrases
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            keywords,
            reject_phrases,
            check_item_text: filter.check_item_text,
        }
    }

    /// Guard that accepts every relevant verdict
    pub fn permissive() -> Self {
        Self {
            keywords: Vec::new(),
            reject_phrases: Vec::new(),
            check_item_text: false,
        }
    }

    /// Check if a verdict should be kept as a relevant post
    pub fn accepts(&self, verdict: &RelevanceVerdict, item: &FeedItem) -> bool {
        self.evaluate(verdict, item).is_accepted()
    }

    /// Evaluate a verdict against the rules, in order
    pub fn evaluate(&self, verdict: &RelevanceVerdict, item: &FeedItem) -> GuardDecision {
        if !verdict.relevant {
            return GuardDecision::NotRelevant;
        }

        let reason = verdict.reason.as_deref().unwrap_or_default();
        let reason_lower = reason.to_lowercase();
        if let Some(phrase) = self
            .reject_phrases
            .iter()
            .find(|p| reason_lower.contains(p.as_str()))
        {
            return GuardDecision::Contradicted {
                phrase: phrase.clone(),
            };
        }

        if self.keywords.is_empty() {
            return GuardDecision::Accepted { keyword: None };
        }

        let mut haystacks: Vec<&str> = vec![reason];
        haystacks.extend(verdict.tags.iter().map(String::as_str));
        if self.check_item_text {
            haystacks.push(&item.title);
            if let Some(description) = item.description.as_deref() {
                haystacks.push(description);
            }
        }

        self.keywords
            .iter()
            .find(|k| haystacks.iter().any(|h| k.pattern.is_match(h)))
            .map_or(GuardDecision::NoSignal, |k| GuardDecision::Accepted {
                keyword: Some(k.text.clone()),
            })
    }
}

impl Default for FalsePositiveGuard {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

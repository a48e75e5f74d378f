//! Model response parsing
//!
//! Turns the raw text returned by the model into a typed
//! [`RelevanceVerdict`]. The structured JSON path is tried first; the text
//! heuristics in [`parse_text_fallback`] only run when no usable JSON object
//! is found.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::models::RelevanceVerdict;
use crate::utils::error::VerdictParseError;
use crate::utils::truncate_text;

/// Longest reason kept from a free-text response
const FALLBACK_REASON_CHARS: usize = 200;

/// Key spellings models use for each verdict field, in lookup order
const FLAG_KEYS: &[&str] = &["relevant", "is_relevant", "isRelevant", "relevance"];
const CONFIDENCE_KEYS: &[&str] = &["confidence", "score", "probability"];
const REASON_KEYS: &[&str] = &["reason", "explanation", "rationale"];
const TAG_KEYS: &[&str] = &["tags", "keywords", "topics"];

/// Parse a model response into a verdict
///
/// # Errors
///
/// - [`VerdictParseError::NoContent`] when the response is blank
/// - [`VerdictParseError::InvalidFlag`] when a JSON object carries a
///   relevance flag that is not a yes/no value
/// - [`VerdictParseError::Unrecognized`] when neither path yields a verdict
pub fn parse_verdict(raw: &str) -> Result<RelevanceVerdict, VerdictParseError> {
    if raw.trim().is_empty() {
        return Err(VerdictParseError::NoContent);
    }

    if let Some(verdict) = parse_structured(raw)? {
        return Ok(verdict);
    }

    tracing::debug!(
        response = %truncate_text(raw.trim(), FALLBACK_REASON_CHARS),
        "No structured verdict found, trying text heuristics"
    );

    parse_text_fallback(raw).ok_or_else(|| {
        VerdictParseError::Unrecognized(truncate_text(raw.trim(), FALLBACK_REASON_CHARS))
    })
}

/// Structured path: a JSON object with a recognizable relevance flag
///
/// Returns `Ok(None)` when there is no object or it has no flag key, so the
/// caller can fall back to text. A flag that is present but unreadable is an
/// error.
fn parse_structured(raw: &str) -> Result<Option<RelevanceVerdict>, VerdictParseError> {
    let Some(json) = extract_json(raw) else {
        return Ok(None);
    };
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(json) else {
        return Ok(None);
    };
    let Some(flag) = first_present(&object, FLAG_KEYS) else {
        return Ok(None);
    };

    let relevant = flag_value(flag)
        .ok_or_else(|| VerdictParseError::InvalidFlag(truncate_text(&flag.to_string(), 40)))?;
    let confidence = first_present(&object, CONFIDENCE_KEYS).and_then(confidence_value);
    let reason = first_present(&object, REASON_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    let tags = first_present(&object, TAG_KEYS)
        .map(tag_values)
        .unwrap_or_default();

    Ok(Some(RelevanceVerdict {
        relevant,
        confidence,
        reason,
        tags: RelevanceVerdict::normalize_tags(tags),
        raw_response: raw.to_string(),
    }))
}

/// First non-null value among `keys`
fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Last-resort path for models that ignore the JSON instruction
///
/// Recognizes, in order: an explicit `relevant: yes|no` line, a negated
/// phrase ("not relevant", "not very relevant", "irrelevant"), and a leading
/// yes/no. Anything else is left unrecognized. No tags or confidence are
/// produced.
pub fn parse_text_fallback(raw: &str) -> Option<RelevanceVerdict> {
    static EXPLICIT_RE: OnceLock<Regex> = OnceLock::new();
    static NEGATED_RE: OnceLock<Regex> = OnceLock::new();
    static LEADING_RE: OnceLock<Regex> = OnceLock::new();

    let explicit = EXPLICIT_RE.get_or_init(|| {
        Regex::new(r#"(?i)\brelevan(?:t|ce)\s*[:=]\s*["']?(yes|no|true|false)\b"#)
            .expect("Invalid regex pattern")
    });
    let negated = NEGATED_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:not\s+(?:\w+\s+)?(?:relevant|related)|irrelevant|unrelated)\b")
            .expect("Invalid regex pattern")
    });
    let leading = LEADING_RE
        .get_or_init(|| Regex::new(r"(?i)^\W*(yes|no)\b").expect("Invalid regex pattern"));

    let text = raw.trim();

    let relevant = if let Some(caps) = explicit.captures(text) {
        matches!(caps[1].to_ascii_lowercase().as_str(), "yes" | "true")
    } else if negated.is_match(text) {
        false
    } else if let Some(caps) = leading.captures(text) {
        caps[1].eq_ignore_ascii_case("yes")
    } else {
        return None;
    };

    Some(RelevanceVerdict {
        relevant,
        confidence: None,
        reason: Some(truncate_text(text, FALLBACK_REASON_CHARS)),
        tags: Vec::new(),
        raw_response: raw.to_string(),
    })
}

/// Locate the JSON object inside a response
///
/// Looks for a fenced ```json block, then any fenced block, then the
/// outermost braces.
fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        if let Some(end) = body.find("```") {
            return non_empty(body[..end].trim());
        }
    }

    if let Some(start) = text.find("```") {
        let after_start = &text[start + 3..];
        let content_start = after_start.find('\n').map_or(0, |i| i + 1);
        if let Some(end) = after_start[content_start..].find("```") {
            let block = after_start[content_start..content_start + end].trim();
            if block.starts_with('{') {
                return Some(block);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn flag_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v >= 0.5),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "relevant" | "y" => Some(true),
            "no" | "false" | "not relevant" | "irrelevant" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn confidence_value(value: &Value) -> Option<f32> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };

    if !raw.is_finite() {
        return None;
    }

    let scaled = if raw > 1.0 && raw <= 100.0 {
        raw / 100.0
    } else {
        raw
    };

    Some(scaled.clamp(0.0, 1.0) as f32)
}

fn tag_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

//! Extraction client abstraction
//!
//! An `Extractor` turns one capture artifact (plus the record accumulated so
//! far and the current guided question) into a `PartialResult`. The
//! reconciliation core never talks to a provider directly; the session driver
//! runs the extractor it was handed at construction time.

use async_trait::async_trait;
use sdk::capture::Artifact;
use sdk::errors::EngineError;
use sdk::types::{PartialResult, Record};

pub mod gemini;
pub mod prompt;
pub mod scripted;

pub use gemini::GeminiExtractor;
pub use scripted::ScriptedExtractor;

pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while extracting data from an artifact
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Could not parse model output: {0}")]
    Parse(String),

    #[error("Response blocked: {0}")]
    Blocked(String),
}

impl From<ExtractionError> for EngineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Network(msg) => EngineError::Network(msg),
            other => EngineError::Extraction(other.to_string()),
        }
    }
}

/// Everything an extractor needs for one call
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub artifact: Artifact,
    /// Record as it stood before this artifact, so the model can skip known data
    pub current_record: Record,
    pub current_question: Option<String>,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Provider name for logs (e.g. "gemini")
    fn name(&self) -> &str;

    async fn extract(&self, request: &ExtractionRequest) -> Result<PartialResult>;
}

/// Parse model output into a `PartialResult`
///
/// Accepts, in order:
/// 1. Raw JSON (the whole text is one object)
/// 2. The body of the first markdown code fence
/// 3. The first balanced `{...}` object embedded in prose
///
/// Missing, `null` and wrong-typed fields are treated as absent one by one, so
/// the valid part of a sloppy reply is kept. Only text without any JSON object
/// is a `Parse` error.
pub fn parse_partial_result(text: &str) -> Result<PartialResult> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::Parse("empty response".to_string()));
    }

    if let Some(partial) = try_parse_object(trimmed) {
        return Ok(partial);
    }

    if let Some(body) = extract_fenced_json(trimmed) {
        if let Some(partial) = try_parse_object(body.trim()) {
            return Ok(partial);
        }
    }

    for (pos, _) in trimmed.match_indices('{') {
        if let Some(candidate) = extract_balanced_json(&trimmed[pos..]) {
            if let Some(partial) = try_parse_object(candidate) {
                return Ok(partial);
            }
        }
    }

    Err(ExtractionError::Parse(
        "no JSON object found in model output".to_string(),
    ))
}

/// `None` if `s` is not a JSON object
fn try_parse_object(s: &str) -> Option<PartialResult> {
    let value: serde_json::Value = serde_json::from_str(s).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Body of the first markdown code fence, tolerating trailing prose
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // skip the language tag line
    let body_start = fence_start + 3 + after_opening.find('\n')? + 1;
    let body_end = body_start + content[body_start..].find("```")?;

    (body_start < body_end).then(|| &content[body_start..body_end])
}

/// Balanced JSON object at the start of `s`, respecting string literals
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_json() {
        let partial = parse_partial_result(
            r#"{"party": {"name": "Acme"}, "lineItems": [{"description": "Bolt", "quantity": 10, "unitPrice": 2}], "complete": false}"#,
        )
        .unwrap();
        assert_eq!(partial.item_count(), 1);
        assert!(!partial.complete);
        assert_eq!(partial.party.unwrap().name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_parse_fenced_json_with_trailing_prose() {
        let text = "Here you go:\n```json\n{\"notes\": \"Pago contado\"}\n```\nAnything else?";
        let partial = parse_partial_result(text).unwrap();
        assert_eq!(partial.notes.as_deref(), Some("Pago contado"));
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let text = r#"I found {"party": {"id": "30-123"}, "complete": true} in the audio."#;
        let partial = parse_partial_result(text).unwrap();
        assert_eq!(partial.party.unwrap().id.as_deref(), Some("30-123"));
        assert!(partial.complete);
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_scan() {
        let text = r#"Result: {"notes": "use {curly} braces"} done"#;
        let partial = parse_partial_result(text).unwrap();
        assert_eq!(partial.notes.as_deref(), Some("use {curly} braces"));
    }

    #[test]
    fn test_empty_object_is_empty_partial() {
        let partial = parse_partial_result("{}").unwrap();
        assert!(partial.is_empty());
        assert!(!partial.complete);
    }

    #[test]
    fn test_missing_quantity_defaults_to_one() {
        let partial =
            parse_partial_result(r#"{"lineItems": [{"description": "Café", "unitPrice": 3.5}]}"#)
                .unwrap();
        assert_eq!(partial.line_items.unwrap()[0].quantity, 1.0);
    }

    #[test]
    fn test_unparseable_text_is_parse_error() {
        let err = parse_partial_result("Sorry, I could not read that.").unwrap_err();
        assert!(matches!(err, ExtractionError::Parse(_)));
        assert!(matches!(
            parse_partial_result("   ").unwrap_err(),
            ExtractionError::Parse(_)
        ));
    }

    #[test]
    fn test_wrong_field_type_is_dropped_not_fatal() {
        let partial = parse_partial_result(r#"{"lineItems": "three bolts"}"#).unwrap();
        assert!(partial.is_empty());
    }

    #[test]
    fn test_null_item_fields_keep_party_data() {
        let partial = parse_partial_result(
            r#"{"party":{"name":"Acme","id":"30-1"},"lineItems":[{"description":"Bolt","quantity":null,"unitPrice":2}]}"#,
        )
        .unwrap();

        let party = partial.party.as_ref().unwrap();
        assert_eq!(party.name.as_deref(), Some("Acme"));
        assert_eq!(party.id.as_deref(), Some("30-1"));

        let items = partial.line_items.unwrap();
        assert_eq!(items[0].description, "Bolt");
        assert_eq!(items[0].quantity, 1.0);
        assert_eq!(items[0].unit_price, 2.0);
    }

    #[test]
    fn test_null_description_and_string_complete_are_tolerated() {
        let partial = parse_partial_result(
            r#"{"party":{"name":"Acme"},"lineItems":[{"description":null,"quantity":2,"unitPrice":3}],"complete":"false"}"#,
        )
        .unwrap();

        assert_eq!(partial.party.as_ref().unwrap().name.as_deref(), Some("Acme"));
        assert_eq!(partial.line_items.as_ref().unwrap()[0].description, "");
        assert_eq!(partial.item_count(), 1);
        assert!(!partial.complete);
    }

    #[test]
    fn test_conversion_to_engine_error() {
        let err: EngineError = ExtractionError::RateLimitExceeded.into();
        assert_eq!(err.to_string(), "Extraction failed: Rate limit exceeded");

        let err: EngineError = ExtractionError::Network("connection reset".to_string()).into();
        assert!(matches!(err, EngineError::Network(_)));
    }
}

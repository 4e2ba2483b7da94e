//! Best-effort structured output extraction
//!
//! Callers that prompt for JSON get back whatever the model produced. This
//! models the outcome honestly: either a parsed value, or the raw text.
//! One is never silently coerced into the other's shape.

use serde::{Deserialize, Serialize};

/// Outcome of attempting to read structured data out of generated text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StructuredOutput {
    /// The text parsed (possibly after stripping a code fence) as JSON
    Parsed(serde_json::Value),
    /// No JSON could be extracted; the original text, untouched
    Raw(String),
}

impl StructuredOutput {
    /// Try to extract a JSON value from generated text.
    ///
    /// Attempts, in order: the whole text, the body of a ```json fence,
    /// and the outermost `{...}` span. Falls back to `Raw` with the
    /// original text.
    pub fn parse_best_effort(text: &str) -> Self {
        let trimmed = text.trim();

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return StructuredOutput::Parsed(value);
        }

        if let Some(body) = extract_fenced_block(trimmed) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
                return StructuredOutput::Parsed(value);
            }
        }

        if let Some(span) = extract_object_span(trimmed) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(span) {
                return StructuredOutput::Parsed(value);
            }
        }

        StructuredOutput::Raw(text.to_string())
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, StructuredOutput::Parsed(_))
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            StructuredOutput::Parsed(value) => Some(value),
            StructuredOutput::Raw(_) => None,
        }
    }
}

/// Body of the first fenced code block, tolerating a ```json info string
fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Outermost `{...}` span in the text
fn extract_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

//! Heuristic token estimation
//!
//! Used wherever a real tokenizer is unavailable: cost projections before a
//! call, and accounting for streamed responses whose upstream reports no
//! usage. Word count times 1.3 is the convention callers must treat as an
//! estimate, not an exact figure.

use crate::core::types::GenerationRequest;

/// Multiplier applied to the whitespace-separated word count
const WORDS_TO_TOKENS: f64 = 1.3;

/// Approximate token count for a piece of text
pub fn approximate_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let words = text.split_whitespace().count();
    (words as f64 * WORDS_TO_TOKENS).ceil() as u32
}

/// Approximate input token count for a full request: system instruction,
/// prior history, and the new prompt
pub fn approximate_input_tokens(request: &GenerationRequest) -> u32 {
    let mut total = approximate_tokens(&request.prompt);
    if let Some(context) = &request.context {
        if let Some(system) = &context.system {
            total += approximate_tokens(system);
        }
        for turn in &context.history {
            total += approximate_tokens(&turn.content);
        }
    }
    total
}

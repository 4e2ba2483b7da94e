//! Static per-model price tables and the shared cost formula
//!
//! Prices are USD per 1000 tokens, input/output asymmetric. Cent-level
//! tables round to 6 decimals; sub-cent high-volume tables round to 8.
//! Local inference is free and bypasses this module entirely.

use crate::core::types::GenerationRequest;
use crate::utils::tokens;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Price for one model, per 1000 tokens
#[derive(Debug, Clone, Copy)]
pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Output-token budget assumed when a request sets no max_tokens
pub const DEFAULT_OUTPUT_BUDGET: u32 = 256;

pub static OPENAI_PRICES: Lazy<HashMap<&'static str, ModelPrice>> = Lazy::new(|| {
    HashMap::from([
        (
            "gpt-4o",
            ModelPrice {
                input_per_1k: 0.0025,
                output_per_1k: 0.01,
            },
        ),
        (
            "gpt-4o-mini",
            ModelPrice {
                input_per_1k: 0.00015,
                output_per_1k: 0.0006,
            },
        ),
        (
            "gpt-4-turbo",
            ModelPrice {
                input_per_1k: 0.01,
                output_per_1k: 0.03,
            },
        ),
        (
            "gpt-3.5-turbo",
            ModelPrice {
                input_per_1k: 0.0005,
                output_per_1k: 0.0015,
            },
        ),
    ])
});

pub static ANTHROPIC_PRICES: Lazy<HashMap<&'static str, ModelPrice>> = Lazy::new(|| {
    HashMap::from([
        (
            "claude-3-5-sonnet-20241022",
            ModelPrice {
                input_per_1k: 0.003,
                output_per_1k: 0.015,
            },
        ),
        (
            "claude-3-5-haiku-20241022",
            ModelPrice {
                input_per_1k: 0.0008,
                output_per_1k: 0.004,
            },
        ),
        (
            "claude-3-opus-20240229",
            ModelPrice {
                input_per_1k: 0.015,
                output_per_1k: 0.075,
            },
        ),
    ])
});

pub static PERPLEXITY_PRICES: Lazy<HashMap<&'static str, ModelPrice>> = Lazy::new(|| {
    HashMap::from([
        (
            "sonar",
            ModelPrice {
                input_per_1k: 0.001,
                output_per_1k: 0.001,
            },
        ),
        (
            "sonar-pro",
            ModelPrice {
                input_per_1k: 0.003,
                output_per_1k: 0.015,
            },
        ),
        (
            "sonar-reasoning",
            ModelPrice {
                input_per_1k: 0.001,
                output_per_1k: 0.005,
            },
        ),
    ])
});

/// Look up a model price, tolerating versioned names by prefix match
pub fn lookup(table: &HashMap<&'static str, ModelPrice>, model: &str) -> Option<ModelPrice> {
    if let Some(price) = table.get(model) {
        return Some(*price);
    }
    table
        .iter()
        .find(|(key, _)| model.starts_with(*key))
        .map(|(_, price)| *price)
}

/// `input/1000 * p_in + output/1000 * p_out`, rounded to `decimals`
pub fn cost_for(price: ModelPrice, input_tokens: u32, output_tokens: u32, decimals: u32) -> f64 {
    let raw = input_tokens as f64 / 1000.0 * price.input_per_1k
        + output_tokens as f64 / 1000.0 * price.output_per_1k;
    round_to(raw, decimals)
}

/// Cost from a combined count only: split 50/50 before applying asymmetric
/// prices. Documented approximation, not a precision guarantee.
pub fn cost_for_total(price: ModelPrice, total_tokens: u32, decimals: u32) -> f64 {
    let input = total_tokens / 2;
    let output = total_tokens - input;
    cost_for(price, input, output, decimals)
}

/// Pre-call cost projection: estimated input tokens plus the requested (or
/// default) output budget
pub fn estimate_request_cost(
    table: &HashMap<&'static str, ModelPrice>,
    request: &GenerationRequest,
    decimals: u32,
) -> f64 {
    let Some(price) = lookup(table, &request.model) else {
        return 0.0;
    };
    let input_tokens = tokens::approximate_input_tokens(request);
    let output_tokens = request.max_tokens.unwrap_or(DEFAULT_OUTPUT_BUDGET);
    cost_for(price, input_tokens, output_tokens, decimals)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

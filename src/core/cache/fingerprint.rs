//! Request fingerprinting
//!
//! SHA-256 over a canonical, key-sorted JSON rendering of the semantically
//! relevant request fields. Two requests with identical field values must
//! hash identically regardless of how their context maps were populated,
//! which the `BTreeMap` rendering guarantees.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::core::types::GenerationRequest;

/// Deterministic cache key for a request.
///
/// Covers prompt, model, temperature, max_tokens, top_p, and the full
/// context bundle (system instruction, entire history, extras). The
/// streaming flag and the session identifier are bookkeeping, not
/// generation semantics, and are excluded.
pub fn fingerprint(request: &GenerationRequest) -> String {
    let mut fields: BTreeMap<&'static str, Value> = BTreeMap::new();
    fields.insert("prompt", Value::String(request.prompt.clone()));
    fields.insert("model", Value::String(request.model.clone()));
    fields.insert("temperature", float_value(request.temperature));
    fields.insert(
        "max_tokens",
        request.max_tokens.map(Value::from).unwrap_or(Value::Null),
    );
    fields.insert("top_p", float_value(request.top_p));
    fields.insert("context", context_value(request));

    let rendered = serde_json::to_string(&fields).unwrap_or_default();
    let digest = Sha256::digest(rendered.as_bytes());
    hex::encode(digest)
}

fn float_value(value: Option<f32>) -> Value {
    value
        .and_then(|v| serde_json::Number::from_f64(f64::from(v)))
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn context_value(request: &GenerationRequest) -> Value {
    let Some(context) = &request.context else {
        return Value::Null;
    };

    let mut fields: BTreeMap<&'static str, Value> = BTreeMap::new();
    fields.insert(
        "system",
        context
            .system
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    fields.insert(
        "history",
        Value::Array(
            context
                .history
                .iter()
                .map(|turn| {
                    Value::Array(vec![
                        Value::String(turn.role.to_string()),
                        Value::String(turn.content.clone()),
                    ])
                })
                .collect(),
        ),
    );
    fields.insert(
        "extras",
        Value::Object(
            context
                .extras
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
    );
    serde_json::to_value(fields).unwrap_or(Value::Null)
}

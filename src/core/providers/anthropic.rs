//! Hosted completion adapter (Anthropic messages API)
//!
//! `x-api-key` auth plus a version header. Unlike the OpenAI-shaped
//! providers, the system instruction travels as a dedicated top-level
//! `system` field, not as a message. The messages API requires an explicit
//! max_tokens, so a default is applied when the request sets none.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::ProviderKind;
use super::adapter::ProviderAdapter;
use super::error::{ProviderError, map_http_status};
use super::pricing::{self, ANTHROPIC_PRICES};
use crate::config::ProviderSettings;
use crate::core::types::{GenerationRequest, GenerationResponse, TokenUsage};

const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const PRICE_DECIMALS: u32 = 6;

/// max_tokens applied when the caller sets none (the API rejects absent)
const DEFAULT_MAX_TOKENS: u32 = 1024;

const MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
];

/// Adapter for the Anthropic messages API
pub struct AnthropicAdapter {
    credential: Option<String>,
    base_url: String,
    /// Configured default; listed first so model resolution picks it
    default_model: Option<String>,
    /// `None` once closed; generation after close is a transport error
    client: RwLock<Option<reqwest::Client>>,
}

impl AnthropicAdapter {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| {
                ProviderError::network(PROVIDER, format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            credential: settings.credential.clone(),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: settings.default_model.clone(),
            client: RwLock::new(Some(client)),
        })
    }

    fn transport(&self) -> Result<reqwest::Client, ProviderError> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| ProviderError::network(PROVIDER, "transport closed"))
    }

    /// Wire body for `/v1/messages`; always a non-streaming call, the
    /// orchestration layer only ever surfaces materialized responses
    fn request_body(&self, request: &GenerationRequest) -> Value {
        let messages: Vec<Value> = request
            .conversation()
            .into_iter()
            .map(|turn| json!({"role": turn.role.to_string(), "content": turn.content}))
            .collect();

        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
        });
        if let Some(system) = request.system_instruction() {
            body["system"] = json!(system);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<Value, ProviderError> {
        let credential = self.credential.as_deref().ok_or_else(|| {
            ProviderError::authentication(PROVIDER, "no API credential configured")
        })?;
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let response = self
            .transport()?
            .post(&url)
            .header("x-api-key", credential)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::timeout(PROVIDER, e.to_string())
                } else {
                    ProviderError::network(PROVIDER, e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;
        if !status.is_success() {
            return Err(map_http_status(PROVIDER, status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| ProviderError::parse(PROVIDER, e.to_string()))
    }

    fn parse_response(
        &self,
        request: &GenerationRequest,
        payload: &Value,
    ) -> Result<GenerationResponse, ProviderError> {
        let content = payload
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            })
            .and_then(|b| b.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| ProviderError::empty_completion(PROVIDER, request.model.clone()))?;

        let usage = payload
            .get("usage")
            .map(|u| {
                TokenUsage::new(
                    u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                    u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                )
            })
            .unwrap_or_default();

        let cost = pricing::lookup(&ANTHROPIC_PRICES, &request.model)
            .map(|price| {
                pricing::cost_for(
                    price,
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    PRICE_DECIMALS,
                )
            })
            .unwrap_or(0.0);

        let mut response = GenerationResponse::new(content, PROVIDER, request.model.clone())
            .with_usage(usage)
            .with_cost(cost);
        if let Some(reason) = payload.get("stop_reason") {
            response = response.with_metadata("stop_reason", reason.clone());
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let body = self.request_body(request);
        let payload = self.send(&body).await?;
        self.parse_response(request, &payload)
    }

    fn validate_config(&self) -> bool {
        self.credential
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    async fn available_models(&self) -> Vec<String> {
        super::promote_default(
            MODELS.iter().map(|m| m.to_string()).collect(),
            self.default_model.as_deref(),
        )
    }

    fn estimate_cost(&self, request: &GenerationRequest) -> f64 {
        pricing::estimate_request_cost(&ANTHROPIC_PRICES, request, PRICE_DECIMALS)
    }

    fn close(&self) {
        debug!("closing anthropic transport");
        *self.client.write() = None;
    }
}

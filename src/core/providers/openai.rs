//! Hosted completion adapter (OpenAI chat completions API)
//!
//! Bearer-token auth. The system instruction travels as a leading
//! system-role message in the messages array. Streamed calls are buffered
//! from SSE into one materialized response.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::ProviderKind;
use super::adapter::ProviderAdapter;
use super::error::{ProviderError, map_http_status};
use super::pricing::{self, OPENAI_PRICES};
use crate::config::ProviderSettings;
use crate::core::types::{GenerationRequest, GenerationResponse, MessageRole, TokenUsage};
use crate::utils::tokens;

const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const PRICE_DECIMALS: u32 = 6;

const MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"];

/// Adapter for the OpenAI chat completions API
pub struct OpenAiAdapter {
    credential: Option<String>,
    base_url: String,
    /// Configured default; listed first so model resolution picks it
    default_model: Option<String>,
    /// `None` once closed; generation after close is a transport error
    client: RwLock<Option<reqwest::Client>>,
}

impl OpenAiAdapter {
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

    /// Wire body for `/v1/chat/completions`
    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = request.system_instruction() {
            messages.push(json!({"role": MessageRole::System.to_string(), "content": system}));
        }
        for turn in request.conversation() {
            messages.push(json!({"role": turn.role.to_string(), "content": turn.content}));
        }

        let mut body = json!({
            "model": request.model,
            "messages": messages,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }
        if request.stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let credential = self.credential.as_deref().ok_or_else(|| {
            ProviderError::authentication(PROVIDER, "no API credential configured")
        })?;
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .transport()?
            .post(&url)
            .bearer_auth(credential)
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
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_http_status(PROVIDER, status.as_u16(), &text));
        }
        Ok(response)
    }

    fn parse_response(
        &self,
        request: &GenerationRequest,
        payload: &Value,
    ) -> Result<GenerationResponse, ProviderError> {
        let choice = payload
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| ProviderError::parse(PROVIDER, "response carries no choices"))?;

        let content = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| ProviderError::empty_completion(PROVIDER, request.model.clone()))?;

        // Provider-reported usage when present; zeroes otherwise
        let usage = payload
            .get("usage")
            .map(|u| {
                TokenUsage::new(
                    u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                    u.get("completion_tokens")
                        .and_then(|v| v.as_u64())
                        .unwrap_or(0) as u32,
                )
            })
            .unwrap_or_default();

        let cost = pricing::lookup(&OPENAI_PRICES, &request.model)
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
        if let Some(reason) = choice.get("finish_reason") {
            response = response.with_metadata("finish_reason", reason.clone());
        }
        Ok(response)
    }

    /// Buffer an SSE stream (`data: {json}` lines) into one response.
    ///
    /// Streamed calls get word-count token accounting.
    async fn collect_stream(
        &self,
        request: &GenerationRequest,
        response: reqwest::Response,
    ) -> Result<GenerationResponse, ProviderError> {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut text = String::new();
        let mut finish_reason: Option<Value> = None;
        let mut saw_delta = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() || data == "[DONE]" {
                    continue;
                }
                let value: Value = serde_json::from_str(data)
                    .map_err(|e| ProviderError::parse(PROVIDER, e.to_string()))?;
                let Some(choice) = value
                    .get("choices")
                    .and_then(|c| c.as_array())
                    .and_then(|c| c.first())
                else {
                    continue;
                };
                if let Some(piece) = choice
                    .get("delta")
                    .and_then(|d| d.get("content"))
                    .and_then(|c| c.as_str())
                {
                    saw_delta = true;
                    text.push_str(piece);
                }
                if let Some(reason) = choice.get("finish_reason") {
                    if !reason.is_null() {
                        finish_reason = Some(reason.clone());
                    }
                }
            }
        }

        if !saw_delta {
            return Err(ProviderError::empty_completion(PROVIDER, request.model.clone()));
        }

        let usage = TokenUsage::new(
            tokens::approximate_input_tokens(request),
            tokens::approximate_tokens(&text),
        );
        let cost = pricing::lookup(&OPENAI_PRICES, &request.model)
            .map(|price| {
                pricing::cost_for(
                    price,
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    PRICE_DECIMALS,
                )
            })
            .unwrap_or(0.0);

        let mut materialized = GenerationResponse::new(text, PROVIDER, request.model.clone())
            .with_usage(usage)
            .with_cost(cost);
        if let Some(reason) = finish_reason {
            materialized = materialized.with_metadata("finish_reason", reason);
        }
        Ok(materialized)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let body = self.request_body(request);
        let response = self.send(&body).await?;

        if request.stream {
            self.collect_stream(request, response).await
        } else {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| ProviderError::parse(PROVIDER, e.to_string()))?;
            self.parse_response(request, &payload)
        }
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
        pricing::estimate_request_cost(&OPENAI_PRICES, request, PRICE_DECIMALS)
    }

    fn close(&self) {
        debug!("closing openai transport");
        *self.client.write() = None;
    }
}

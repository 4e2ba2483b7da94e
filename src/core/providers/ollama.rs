//! Local inference adapter (Ollama daemon)
//!
//! No credential, zero cost. The model list comes from a one-time probe of
//! the daemon's tag endpoint, with a static fallback when the daemon is
//! unreachable at probe time.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::ProviderKind;
use super::adapter::ProviderAdapter;
use super::error::{ProviderError, map_http_status};
use crate::config::ProviderSettings;
use crate::core::types::{GenerationRequest, GenerationResponse, MessageRole, TokenUsage};
use crate::utils::tokens;

const PROVIDER: &str = "ollama";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Models assumed present when the daemon cannot be probed
const FALLBACK_MODELS: &[&str] = &["llama3.1:8b", "llama3.2:3b", "mistral:7b", "qwen2.5:7b"];

/// Adapter for a local Ollama daemon
pub struct OllamaAdapter {
    base_url: String,
    /// Configured default; listed first so model resolution picks it
    default_model: Option<String>,
    /// `None` once closed; generation after close is a transport error
    client: RwLock<Option<reqwest::Client>>,
    /// Probed model list; filled at most once
    models: RwLock<Option<Vec<String>>>,
}

impl OllamaAdapter {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| {
                ProviderError::network(PROVIDER, format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: settings.default_model.clone(),
            client: RwLock::new(Some(client)),
            models: RwLock::new(None),
        })
    }

    /// Local model names are user-defined, so a configured default is
    /// listed even when the probe did not report it
    fn with_default_first(&self, mut models: Vec<String>) -> Vec<String> {
        if let Some(default) = &self.default_model {
            models.retain(|m| m != default);
            models.insert(0, default.clone());
        }
        models
    }

    fn transport(&self) -> Result<reqwest::Client, ProviderError> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| ProviderError::network(PROVIDER, "transport closed"))
    }

    /// Wire body for `/api/chat`
    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = request.system_instruction() {
            messages.push(json!({"role": MessageRole::System.to_string(), "content": system}));
        }
        for turn in request.conversation() {
            messages.push(json!({"role": turn.role.to_string(), "content": turn.content}));
        }

        let mut options = serde_json::Map::new();
        if let Some(temperature) = request.temperature {
            options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(top_p) = request.top_p {
            options.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(max_tokens) = request.max_tokens {
            options.insert("num_predict".to_string(), json!(max_tokens));
        }

        json!({
            "model": request.model,
            "messages": messages,
            "stream": request.stream,
            "options": Value::Object(options),
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let response = self
            .transport()?
            .post(&url)
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
        let content = payload
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| ProviderError::empty_completion(PROVIDER, request.model.clone()))?;

        let prompt_tokens = payload
            .get("prompt_eval_count")
            .and_then(|v| v.as_u64())
            .unwrap_or_else(|| tokens::approximate_input_tokens(request) as u64)
            as u32;
        let completion_tokens = payload
            .get("eval_count")
            .and_then(|v| v.as_u64())
            .unwrap_or_else(|| tokens::approximate_tokens(content) as u64)
            as u32;

        let mut response = GenerationResponse::new(content, PROVIDER, request.model.clone())
            .with_usage(TokenUsage::new(prompt_tokens, completion_tokens));
        if let Some(reason) = payload.get("done_reason") {
            response = response.with_metadata("done_reason", reason.clone());
        }
        Ok(response)
    }

    /// Buffer an NDJSON stream into one materialized response.
    ///
    /// Token accounting for streamed calls uses the word-count
    /// approximation, never partial upstream counts.
    async fn collect_stream(
        &self,
        request: &GenerationRequest,
        response: reqwest::Response,
    ) -> Result<GenerationResponse, ProviderError> {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut text = String::new();
        let mut saw_content = false;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                if line.is_empty() {
                    continue;
                }
                let value: Value = serde_json::from_str(&line)
                    .map_err(|e| ProviderError::parse(PROVIDER, e.to_string()))?;
                if let Some(piece) = value
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .and_then(|c| c.as_str())
                {
                    saw_content = true;
                    text.push_str(piece);
                }
            }
        }

        if !saw_content {
            return Err(ProviderError::empty_completion(PROVIDER, request.model.clone()));
        }

        let usage = TokenUsage::new(
            tokens::approximate_input_tokens(request),
            tokens::approximate_tokens(&text),
        );
        Ok(GenerationResponse::new(text, PROVIDER, request.model.clone()).with_usage(usage))
    }

    async fn probe_models(&self) -> Option<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url.trim_end_matches('/'));
        let client = self.transport().ok()?;
        let payload: Value = client.get(&url).send().await.ok()?.json().await.ok()?;
        let names: Vec<String> = payload
            .get("models")?
            .as_array()?
            .iter()
            .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
            .map(String::from)
            .collect();
        if names.is_empty() { None } else { Some(names) }
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
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
        // Local inference needs no credential; a base URL is always present
        !self.base_url.is_empty()
    }

    async fn available_models(&self) -> Vec<String> {
        if let Some(models) = self.models.read().as_ref() {
            return self.with_default_first(models.clone());
        }

        let probed = match self.probe_models().await {
            Some(models) => models,
            None => {
                debug!("ollama daemon not reachable for model probe, using fallback list");
                FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
            }
        };
        *self.models.write() = Some(probed.clone());
        self.with_default_first(probed)
    }

    /// Local inference is free: exactly 0.0 regardless of prompt length
    fn estimate_cost(&self, _request: &GenerationRequest) -> f64 {
        0.0
    }

    fn close(&self) {
        debug!("closing ollama transport");
        *self.client.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ChatTurn, RequestContext};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(url: &str) -> OllamaAdapter {
        let settings = ProviderSettings::new().with_base_url(url);
        OllamaAdapter::new(&settings).unwrap()
    }

    #[test]
    fn test_system_is_prepended_as_message() {
        let adapter = adapter_for(DEFAULT_BASE_URL);
        let request = GenerationRequest::new("hi", "llama3.1:8b").with_context(
            RequestContext::new()
                .with_system("be brief")
                .with_history(vec![ChatTurn::new(MessageRole::User, "earlier")]),
        );
        let body = adapter.request_body(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "be brief");
        assert_eq!(messages[1]["content"], "earlier");
        assert_eq!(messages[2]["content"], "hi");
    }

    #[test]
    fn test_zero_cost_for_any_prompt() {
        let adapter = adapter_for(DEFAULT_BASE_URL);
        let long_prompt = "word ".repeat(10_000);
        let request = GenerationRequest::new(long_prompt, "llama3.1:8b").with_max_tokens(4096);
        assert_eq!(adapter.estimate_cost(&request), 0.0);
    }

    #[tokio::test]
    async fn test_generate_uses_reported_counts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "pong"},
                "done": true,
                "done_reason": "stop",
                "prompt_eval_count": 7,
                "eval_count": 3,
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server.uri());
        let request = GenerationRequest::new("ping", "llama3.1:8b");
        let response = adapter.generate(&request).await.unwrap();
        assert_eq!(response.text, "pong");
        assert_eq!(response.usage.prompt_tokens, 7);
        assert_eq!(response.usage.completion_tokens, 3);
        assert_eq!(response.cost, 0.0);
        assert_eq!(response.metadata["done_reason"], "stop");
    }

    #[tokio::test]
    async fn test_missing_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": {}, "done": true})),
            )
            .mount(&server)
            .await;

        let adapter = adapter_for(&server.uri());
        let request = GenerationRequest::new("ping", "llama3.1:8b");
        let err = adapter.generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyCompletion { .. }));
    }

    #[tokio::test]
    async fn test_model_probe_falls_back_when_unreachable() {
        // nothing is listening on this port
        let adapter = adapter_for("http://127.0.0.1:1");
        let models = adapter.available_models().await;
        assert!(models.contains(&"llama3.1:8b".to_string()));
        // second call serves the cached list without re-probing
        let again = adapter.available_models().await;
        assert_eq!(models, again);
    }

    #[tokio::test]
    async fn test_configured_default_model_listed_first() {
        let settings = ProviderSettings::new()
            .with_base_url("http://127.0.0.1:1")
            .with_default_model("custom-finetune:latest");
        let adapter = OllamaAdapter::new(&settings).unwrap();
        let models = adapter.available_models().await;
        // present even though the probe could not report it
        assert_eq!(models[0], "custom-finetune:latest");
    }

    #[tokio::test]
    async fn test_generate_after_close_is_a_transport_error() {
        let adapter = adapter_for(DEFAULT_BASE_URL);
        adapter.close();
        let err = adapter
            .generate(&GenerationRequest::new("hi", "llama3.1:8b"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network { .. }));
        // close is idempotent
        adapter.close();
    }
}

//! Search-augmented completion adapter (Perplexity API)
//!
//! OpenAI-shaped wire format with search extras: a domain filter and a
//! recency filter read from the request context bundle, and a citation
//! list surfaced through response metadata. Sub-cent pricing, so costs
//! round to 8 decimals.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::ProviderKind;
use super::adapter::ProviderAdapter;
use super::error::{ProviderError, map_http_status};
use super::pricing::{self, PERPLEXITY_PRICES};
use crate::config::ProviderSettings;
use crate::core::types::{GenerationRequest, GenerationResponse, MessageRole, TokenUsage};

const PROVIDER: &str = "perplexity";
const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const PRICE_DECIMALS: u32 = 8;

const MODELS: &[&str] = &["sonar", "sonar-pro", "sonar-reasoning"];

/// Context-bundle extras this adapter understands
pub const EXTRA_DOMAIN_FILTER: &str = "search_domain_filter";
pub const EXTRA_RECENCY_FILTER: &str = "search_recency_filter";

/// Adapter for the Perplexity search-augmented API
pub struct PerplexityAdapter {
    credential: Option<String>,
    base_url: String,
    /// Configured default; listed first so model resolution picks it
    default_model: Option<String>,
    /// `None` once closed; generation after close is a transport error
    client: RwLock<Option<reqwest::Client>>,
}

impl PerplexityAdapter {
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

    /// Wire body for `/chat/completions`, forwarding search extras
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
        if let Some(domains) = request.extra(EXTRA_DOMAIN_FILTER) {
            body[EXTRA_DOMAIN_FILTER] = domains.clone();
        }
        if let Some(recency) = request.extra(EXTRA_RECENCY_FILTER) {
            body[EXTRA_RECENCY_FILTER] = recency.clone();
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<Value, ProviderError> {
        let credential = self.credential.as_deref().ok_or_else(|| {
            ProviderError::authentication(PROVIDER, "no API credential configured")
        })?;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
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

        let cost = pricing::lookup(&PERPLEXITY_PRICES, &request.model)
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
        if let Some(citations) = payload.get("citations") {
            response = response.with_metadata("citations", citations.clone());
        }
        if let Some(reason) = choice.get("finish_reason") {
            response = response.with_metadata("finish_reason", reason.clone());
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for PerplexityAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Perplexity
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
        pricing::estimate_request_cost(&PERPLEXITY_PRICES, request, PRICE_DECIMALS)
    }

    fn close(&self) {
        debug!("closing perplexity transport");
        *self.client.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RequestContext;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(url: &str) -> PerplexityAdapter {
        let settings = ProviderSettings::new()
            .with_credential("pplx-test")
            .with_base_url(url);
        PerplexityAdapter::new(&settings).unwrap()
    }

    #[test]
    fn test_search_extras_are_forwarded() {
        let adapter = adapter_for(DEFAULT_BASE_URL);
        let request = GenerationRequest::new("latest rust release?", "sonar").with_context(
            RequestContext::new()
                .with_extra(EXTRA_DOMAIN_FILTER, json!(["rust-lang.org"]))
                .with_extra(EXTRA_RECENCY_FILTER, json!("week")),
        );
        let body = adapter.request_body(&request);
        assert_eq!(body[EXTRA_DOMAIN_FILTER], json!(["rust-lang.org"]));
        assert_eq!(body[EXTRA_RECENCY_FILTER], "week");
    }

    #[test]
    fn test_extras_absent_by_default() {
        let adapter = adapter_for(DEFAULT_BASE_URL);
        let body = adapter.request_body(&GenerationRequest::new("q", "sonar"));
        assert!(body.get(EXTRA_DOMAIN_FILTER).is_none());
        assert!(body.get(EXTRA_RECENCY_FILTER).is_none());
    }

    #[tokio::test]
    async fn test_citations_land_in_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "1.84 is current"},
                    "finish_reason": "stop",
                }],
                "citations": ["https://blog.rust-lang.org/..."],
                "usage": {"prompt_tokens": 20, "completion_tokens": 5},
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server.uri());
        let request = GenerationRequest::new("latest rust release?", "sonar");
        let response = adapter.generate(&request).await.unwrap();
        assert_eq!(response.text, "1.84 is current");
        assert!(response.metadata["citations"].is_array());
        // sonar is sub-cent per call at this volume yet still nonzero
        assert!(response.cost > 0.0);
    }
}

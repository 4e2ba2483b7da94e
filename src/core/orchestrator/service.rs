//! The orchestrator service

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::ProviderComparison;
use crate::config::{LimitsConfig, OrchestratorConfig};
use crate::core::cache::{ResponseCache, CacheStats, fingerprint};
use crate::core::error::{OrchestratorError, Result};
use crate::core::providers::{AdapterRegistry, ProviderAdapter};
use crate::core::recorder::{
    MemoryRecorder, RequestMetadata, Turn, UsageEvent, UsageRecorder,
};
use crate::core::types::{
    GenerationOptions, GenerationRequest, GenerationResponse, MessageRole, TokenUsage,
};

/// Prompt used by the active health probe
const HEALTH_PROBE_PROMPT: &str = "ping";

/// Entry point for callers: holds the adapter registry, the response
/// cache, and the recorder, and is safe for concurrent invocation.
///
/// Each call is an independent unit of work; the only shared mutable state
/// is the cache and the recorder, both concurrent-safe. Two racing
/// identical requests may both reach the upstream (accepted race,
/// last-write-wins in the cache).
pub struct Orchestrator {
    registry: AdapterRegistry,
    cache: Option<ResponseCache>,
    recorder: Arc<dyn UsageRecorder>,
    default_provider: Option<String>,
    limits: LimitsConfig,
}

impl Orchestrator {
    /// Assemble from pre-built parts
    pub fn new(
        registry: AdapterRegistry,
        recorder: Arc<dyn UsageRecorder>,
        config: &OrchestratorConfig,
    ) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| ResponseCache::new(Duration::from_secs(config.cache.ttl_secs)));
        Self {
            registry,
            cache,
            recorder,
            default_provider: config.default_provider.clone(),
            limits: config.limits.clone(),
        }
    }

    /// Validate the configuration, build the registry from it, and record
    /// through an in-memory recorder
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        let registry = AdapterRegistry::from_config(config);
        Ok(Self::new(registry, Arc::new(MemoryRecorder::new()), config))
    }

    /// Generate once against a single provider.
    ///
    /// Provider resolution: explicit argument, else the configured
    /// default. Model resolution: explicit argument (validated against the
    /// provider's list), else the provider's first available model. The
    /// cache is consulted before dispatch; a hit returns the original
    /// content with only the `cached` flag differing.
    pub async fn generate(
        &self,
        prompt: &str,
        provider: Option<&str>,
        model: Option<&str>,
        options: GenerationOptions,
    ) -> Result<GenerationResponse> {
        let (provider_name, adapter) = self.resolve_provider(provider)?;
        let model = self.resolve_model(&adapter, model).await?;
        let request = self.build_request(prompt, &model, options);

        let key = fingerprint(&request);
        if let Some(hit) = self.cache_lookup(&request, &key) {
            debug!(provider = %provider_name, model = %model, "serving cached response");
            let mut response = hit;
            response.cached = true;
            response.latency_ms = 0;
            // a hit is still a (free, zero-latency) successful usage event
            self.record_usage_event(UsageEvent {
                provider: provider_name.clone(),
                model: model.clone(),
                usage: response.usage,
                cost: response.cost,
                success: true,
                latency_ms: 0,
                cached: true,
            })
            .await;
            self.record_turns(&request, &response, None).await;
            return Ok(response);
        }

        let request_id = self.record_request_meta(&provider_name, &request).await;
        let started = Instant::now();
        match adapter.generate(&request).await {
            Ok(mut response) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                response.latency_ms = latency_ms;
                response.cached = false;

                // only finalized non-streaming responses are cached
                if !request.stream {
                    if let Some(cache) = &self.cache {
                        cache.put(key, response.clone());
                    }
                }

                if let Some(id) = request_id {
                    if let Err(e) = self.recorder.record_response(id, &response, latency_ms).await
                    {
                        warn!(error = %e, "failed to record response");
                    }
                }
                self.record_usage_event(UsageEvent {
                    provider: provider_name.clone(),
                    model: model.clone(),
                    usage: response.usage,
                    cost: response.cost,
                    success: true,
                    latency_ms,
                    cached: false,
                })
                .await;
                self.record_turns(&request, &response, request_id).await;
                Ok(response)
            }
            Err(e) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                warn!(provider = %provider_name, model = %model, error = %e, "generation failed");
                self.record_usage_event(UsageEvent {
                    provider: provider_name,
                    model,
                    usage: TokenUsage::default(),
                    cost: 0.0,
                    success: false,
                    latency_ms,
                    cached: false,
                })
                .await;
                Err(e.into())
            }
        }
    }

    /// Try providers strictly in the given order, returning the first
    /// success. Providers after a success are never attempted. When every
    /// provider fails, the aggregate error carries the attempted names and
    /// the last underlying failure.
    pub async fn generate_with_fallback(
        &self,
        prompt: &str,
        providers: &[&str],
        options: GenerationOptions,
    ) -> Result<GenerationResponse> {
        if providers.is_empty() {
            return Err(OrchestratorError::NoProvider);
        }

        let mut attempted = Vec::with_capacity(providers.len());
        let mut last: Option<OrchestratorError> = None;
        for &name in providers {
            attempted.push(name.to_string());
            match self.generate(prompt, Some(name), None, options.clone()).await {
                Ok(response) => {
                    info!(provider = %name, attempts = attempted.len(), "fallback chain satisfied");
                    return Ok(response);
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "fallback provider failed, trying next");
                    last = Some(e);
                }
            }
        }

        let Some(last) = last else {
            return Err(OrchestratorError::NoProvider);
        };
        Err(OrchestratorError::AggregateFailure {
            attempted,
            last: Box::new(last),
        })
    }

    /// Issue one generation per provider concurrently and collect every
    /// outcome. A provider's failure becomes an error marker in its slot;
    /// no failure aborts the other sub-calls and nothing escapes this
    /// method.
    pub async fn compare(
        &self,
        prompt: &str,
        providers: &[&str],
        options: GenerationOptions,
    ) -> Vec<ProviderComparison> {
        let calls = providers.iter().map(|&name| {
            let options = options.clone();
            async move {
                let outcome = self
                    .generate(prompt, Some(name), None, options)
                    .await
                    .map_err(|e| e.to_string());
                ProviderComparison {
                    provider: name.to_string(),
                    outcome,
                }
            }
        });
        join_all(calls).await
    }

    /// Cost projection without generation.
    ///
    /// Returns 0.0 for an unregistered provider: this one path never
    /// fails on a missing provider; check [`Self::available_providers`]
    /// for registration.
    pub async fn estimate_cost(
        &self,
        prompt: &str,
        provider: &str,
        model: Option<&str>,
        options: GenerationOptions,
    ) -> f64 {
        let Some(adapter) = self.registry.get(provider) else {
            debug!(provider = %provider, "cost estimate for unregistered provider is 0.0");
            return 0.0;
        };
        let model = match model {
            Some(m) => m.to_string(),
            None => match adapter.available_models().await.first().cloned() {
                Some(m) => m,
                None => return 0.0,
            },
        };
        let request = self.build_request(prompt, &model, options);
        adapter.estimate_cost(&request)
    }

    /// Active health probe: one minimal real generation per registered
    /// provider, concurrently. Callers must treat this as having real cost
    /// and latency, not a passive status read.
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let probes = self.registry.adapters().map(|adapter| {
            let adapter = Arc::clone(adapter);
            async move {
                let healthy = self.probe_provider(&adapter).await;
                (adapter.name().to_string(), healthy)
            }
        });
        join_all(probes).await.into_iter().collect()
    }

    /// Registered provider names
    pub fn available_providers(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Model list for one registered provider
    pub async fn available_models(&self, provider: &str) -> Result<Vec<String>> {
        let adapter = self
            .registry
            .get(provider)
            .ok_or_else(|| OrchestratorError::UnknownProvider(provider.to_string()))?;
        Ok(adapter.available_models().await)
    }

    /// Conversation history for a session, oldest-first. Recorder failures
    /// surface as an empty history with a warning, never as an error.
    pub async fn history(&self, session_id: &str, limit: Option<usize>) -> Vec<Turn> {
        match self.recorder.get_history(session_id, limit).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(session = %session_id, error = %e, "failed to load conversation history");
                Vec::new()
            }
        }
    }

    /// Cache counters, when caching is enabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Drop expired cache entries; returns how many were removed
    pub fn sweep_cache(&self) -> usize {
        self.cache.as_ref().map(|c| c.sweep()).unwrap_or(0)
    }

    /// Release every adapter's transport
    pub fn shutdown(&self) {
        info!("shutting down orchestrator, closing adapter transports");
        self.registry.close_all();
    }

    fn resolve_provider(
        &self,
        explicit: Option<&str>,
    ) -> Result<(String, Arc<dyn ProviderAdapter>)> {
        let name = match explicit {
            Some(name) => name.to_string(),
            None => self
                .default_provider
                .clone()
                .ok_or(OrchestratorError::NoProvider)?,
        };
        let adapter = self
            .registry
            .get(&name)
            .ok_or_else(|| OrchestratorError::UnknownProvider(name.clone()))?;
        Ok((name, adapter))
    }

    async fn resolve_model(
        &self,
        adapter: &Arc<dyn ProviderAdapter>,
        explicit: Option<&str>,
    ) -> Result<String> {
        let models = adapter.available_models().await;
        match explicit {
            Some(model) => {
                if models.iter().any(|m| m == model) {
                    Ok(model.to_string())
                } else {
                    Err(OrchestratorError::unknown_model(adapter.name(), model))
                }
            }
            None => models
                .first()
                .cloned()
                .ok_or_else(|| OrchestratorError::NoModel(adapter.name().to_string())),
        }
    }

    fn build_request(
        &self,
        prompt: &str,
        model: &str,
        options: GenerationOptions,
    ) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            model: model.to_string(),
            temperature: options.temperature.or(Some(self.limits.temperature)),
            max_tokens: options.max_tokens.or(Some(self.limits.max_tokens)),
            top_p: options.top_p,
            stream: options.stream,
            context: options.context,
        }
    }

    fn cache_lookup(&self, request: &GenerationRequest, key: &str) -> Option<GenerationResponse> {
        if request.stream {
            return None;
        }
        self.cache.as_ref()?.get(key)
    }

    async fn probe_provider(&self, adapter: &Arc<dyn ProviderAdapter>) -> bool {
        let models = adapter.available_models().await;
        let Some(model) = models.first() else {
            return false;
        };
        let request = GenerationRequest::new(HEALTH_PROBE_PROMPT, model.clone()).with_max_tokens(1);

        let started = Instant::now();
        let result = adapter.generate(&request).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        // probes are real adapter invocations; their outcomes land in the
        // ledger like any other
        let (success, usage, cost) = match &result {
            Ok(response) => (true, response.usage, response.cost),
            Err(_) => (false, TokenUsage::default(), 0.0),
        };
        self.record_usage_event(UsageEvent {
            provider: adapter.name().to_string(),
            model: model.clone(),
            usage,
            cost,
            success,
            latency_ms,
            cached: false,
        })
        .await;

        if let Err(e) = &result {
            warn!(provider = %adapter.name(), error = %e, "health probe failed");
        }
        result.is_ok()
    }

    async fn record_request_meta(
        &self,
        provider: &str,
        request: &GenerationRequest,
    ) -> Option<Uuid> {
        let meta = RequestMetadata {
            provider: provider.to_string(),
            model: request.model.clone(),
            prompt_chars: request.prompt.chars().count(),
            stream: request.stream,
        };
        match self.recorder.record_request(meta).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "failed to record request metadata");
                None
            }
        }
    }

    /// Recorder failures are logged, never raised: an answered request
    /// with a missing ledger entry beats a failed request with a ledger
    /// entry.
    async fn record_usage_event(&self, event: UsageEvent) {
        if let Err(e) = self.recorder.record_usage(event).await {
            warn!(error = %e, "failed to record usage event");
        }
    }

    async fn record_turns(
        &self,
        request: &GenerationRequest,
        response: &GenerationResponse,
        request_id: Option<Uuid>,
    ) {
        let Some(session) = request.session_id() else {
            return;
        };
        if let Err(e) = self
            .recorder
            .append_turn(session, MessageRole::User, &request.prompt, None)
            .await
        {
            warn!(session = %session, error = %e, "failed to append user turn");
            return;
        }
        if let Err(e) = self
            .recorder
            .append_turn(session, MessageRole::Assistant, &response.text, request_id)
            .await
        {
            warn!(session = %session, error = %e, "failed to append assistant turn");
        }
    }
}

//! Orchestrator tests against scripted in-process adapters

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

use super::Orchestrator;
use crate::config::{CacheSettings, OrchestratorConfig};
use crate::core::error::OrchestratorError;
use crate::core::providers::{AdapterRegistry, ProviderAdapter, ProviderError, ProviderKind};
use crate::core::recorder::{
    Granularity, MemoryRecorder, RecorderError, RequestMetadata, Turn, UsageEvent, UsageRecorder,
};
use crate::core::types::{
    GenerationOptions, GenerationRequest, GenerationResponse, MessageRole, RequestContext,
    TokenUsage,
};

/// Scripted adapter: fixed model list, configurable success/failure, call
/// counter for asserting dispatch behavior
struct MockAdapter {
    name: &'static str,
    models: Vec<String>,
    fail: bool,
    cost: f64,
    calls: AtomicU32,
}

impl MockAdapter {
    fn ok(name: &'static str, cost: f64) -> Arc<Self> {
        Arc::new(Self {
            name,
            models: vec![format!("{}-large", name), format!("{}-small", name)],
            fail: false,
            cost,
            calls: AtomicU32::new(0),
        })
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            models: vec![format!("{}-large", name)],
            fail: true,
            cost: 0.0,
            calls: AtomicU32::new(0),
        })
    }

    fn modelless(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            models: Vec::new(),
            fail: false,
            cost: 0.0,
            calls: AtomicU32::new(0),
        })
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::network(self.name, "scripted failure"));
        }
        Ok(
            GenerationResponse::new(format!("echo: {}", request.prompt), self.name, &request.model)
                .with_usage(TokenUsage::new(10, 5))
                .with_cost(self.cost),
        )
    }

    fn validate_config(&self) -> bool {
        true
    }

    async fn available_models(&self) -> Vec<String> {
        self.models.clone()
    }

    fn estimate_cost(&self, _request: &GenerationRequest) -> f64 {
        self.cost
    }
}

/// Recorder whose every operation fails, for proving recording never masks
/// a successful generation
struct FailingRecorder;

#[async_trait]
impl UsageRecorder for FailingRecorder {
    async fn record_request(&self, _meta: RequestMetadata) -> Result<Uuid, RecorderError> {
        Err(RecorderError("ledger offline".to_string()))
    }

    async fn record_response(
        &self,
        _request_id: Uuid,
        _response: &GenerationResponse,
        _latency_ms: u64,
    ) -> Result<(), RecorderError> {
        Err(RecorderError("ledger offline".to_string()))
    }

    async fn record_usage(&self, _event: UsageEvent) -> Result<(), RecorderError> {
        Err(RecorderError("ledger offline".to_string()))
    }

    async fn append_turn(
        &self,
        _session_id: &str,
        _role: MessageRole,
        _content: &str,
        _request_id: Option<Uuid>,
    ) -> Result<Uuid, RecorderError> {
        Err(RecorderError("ledger offline".to_string()))
    }

    async fn get_history(
        &self,
        _session_id: &str,
        _limit: Option<usize>,
    ) -> Result<Vec<Turn>, RecorderError> {
        Err(RecorderError("ledger offline".to_string()))
    }
}

fn config_with_default(default: Option<&str>) -> OrchestratorConfig {
    OrchestratorConfig {
        default_provider: default.map(String::from),
        ..Default::default()
    }
}

fn orchestrator_with(
    adapters: Vec<Arc<MockAdapter>>,
    config: &OrchestratorConfig,
) -> (Orchestrator, Arc<MemoryRecorder>) {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    let recorder = Arc::new(MemoryRecorder::new());
    (
        Orchestrator::new(registry, recorder.clone(), config),
        recorder,
    )
}

#[tokio::test]
async fn test_identical_request_twice_hits_cache() {
    let alpha = MockAdapter::ok("alpha", 0.004);
    let config = config_with_default(Some("alpha"));
    let (orchestrator, _) = orchestrator_with(vec![alpha.clone()], &config);

    let options = GenerationOptions {
        temperature: Some(0.3),
        max_tokens: Some(50),
        ..Default::default()
    };

    let first = orchestrator
        .generate("Summarize: The quick brown fox...", None, None, options.clone())
        .await
        .unwrap();
    assert!(!first.cached);
    assert!(first.cost > 0.0);

    let second = orchestrator
        .generate("Summarize: The quick brown fox...", None, None, options)
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.text, first.text);
    assert_eq!(second.cost, first.cost);
    assert_eq!(second.latency_ms, 0);

    // the upstream was only consulted once
    assert_eq!(alpha.call_count(), 1);
}

#[tokio::test]
async fn test_cache_disabled_always_dispatches() {
    let alpha = MockAdapter::ok("alpha", 0.001);
    let config = OrchestratorConfig {
        default_provider: Some("alpha".to_string()),
        cache: CacheSettings {
            enabled: false,
            ttl_secs: 3600,
        },
        ..Default::default()
    };
    let (orchestrator, _) = orchestrator_with(vec![alpha.clone()], &config);

    for _ in 0..2 {
        let response = orchestrator
            .generate("same prompt", None, None, GenerationOptions::default())
            .await
            .unwrap();
        assert!(!response.cached);
    }
    assert_eq!(alpha.call_count(), 2);
    assert!(orchestrator.cache_stats().is_none());
}

#[tokio::test]
async fn test_streamed_requests_bypass_the_cache() {
    let alpha = MockAdapter::ok("alpha", 0.001);
    let config = config_with_default(Some("alpha"));
    let (orchestrator, _) = orchestrator_with(vec![alpha.clone()], &config);

    let options = GenerationOptions {
        stream: true,
        ..Default::default()
    };
    for _ in 0..2 {
        let response = orchestrator
            .generate("stream me", None, None, options.clone())
            .await
            .unwrap();
        assert!(!response.cached);
    }
    assert_eq!(alpha.call_count(), 2);
}

#[tokio::test]
async fn test_provider_resolution_errors() {
    let (orchestrator, _) =
        orchestrator_with(vec![MockAdapter::ok("alpha", 0.0)], &config_with_default(None));

    // no explicit provider, no default
    let err = orchestrator
        .generate("hi", None, None, GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NoProvider));

    // explicit but unregistered
    let err = orchestrator
        .generate("hi", Some("ghost"), None, GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::UnknownProvider(name) if name == "ghost"));
}

#[tokio::test]
async fn test_model_resolution() {
    let alpha = MockAdapter::ok("alpha", 0.0);
    let empty = MockAdapter::modelless("empty");
    let (orchestrator, _) =
        orchestrator_with(vec![alpha, empty], &config_with_default(None));

    // default model is the provider's first listed one
    let response = orchestrator
        .generate("hi", Some("alpha"), None, GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(response.model, "alpha-large");

    // explicit model must be on the provider's list
    let err = orchestrator
        .generate("hi", Some("alpha"), Some("imaginary"), GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::UnknownModel { .. }));

    // a provider with no models cannot serve a default
    let err = orchestrator
        .generate("hi", Some("empty"), None, GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NoModel(_)));
}

#[tokio::test]
async fn test_fallback_stops_at_first_success() {
    let a = MockAdapter::failing("alpha");
    let b = MockAdapter::failing("beta");
    let c = MockAdapter::ok("gamma", 0.002);
    let d = MockAdapter::ok("delta", 0.002);
    let (orchestrator, _) = orchestrator_with(
        vec![a.clone(), b.clone(), c.clone(), d.clone()],
        &config_with_default(None),
    );

    let response = orchestrator
        .generate_with_fallback(
            "hi",
            &["alpha", "beta", "gamma", "delta"],
            GenerationOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(response.provider, "gamma");
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 1);
    assert_eq!(c.call_count(), 1);
    // nothing after the first success is attempted
    assert_eq!(d.call_count(), 0);
}

#[tokio::test]
async fn test_fallback_aggregate_failure_carries_last_error() {
    let (orchestrator, _) = orchestrator_with(
        vec![MockAdapter::failing("alpha"), MockAdapter::failing("beta")],
        &config_with_default(None),
    );

    let err = orchestrator
        .generate_with_fallback("hi", &["alpha", "beta"], GenerationOptions::default())
        .await
        .unwrap_err();

    match err {
        OrchestratorError::AggregateFailure { attempted, last } => {
            assert_eq!(attempted, vec!["alpha", "beta"]);
            assert!(last.to_string().contains("beta"));
        }
        other => panic!("expected aggregate failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fallback_with_no_providers() {
    let (orchestrator, _) =
        orchestrator_with(vec![MockAdapter::ok("alpha", 0.0)], &config_with_default(None));
    let err = orchestrator
        .generate_with_fallback("hi", &[], GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NoProvider));
}

#[tokio::test]
async fn test_compare_isolates_failures() {
    let (orchestrator, _) = orchestrator_with(
        vec![MockAdapter::failing("alpha"), MockAdapter::ok("beta", 0.001)],
        &config_with_default(None),
    );

    let results = orchestrator
        .compare("hi", &["alpha", "beta"], GenerationOptions::default())
        .await;

    assert_eq!(results.len(), 2);
    let alpha = results.iter().find(|r| r.provider == "alpha").unwrap();
    let beta = results.iter().find(|r| r.provider == "beta").unwrap();
    assert!(!alpha.succeeded());
    assert!(alpha.outcome.as_ref().unwrap_err().contains("alpha"));
    assert!(beta.succeeded());
    assert_eq!(beta.outcome.as_ref().unwrap().provider, "beta");
}

#[tokio::test]
async fn test_usage_buckets_accumulate_per_call() {
    let alpha = MockAdapter::ok("alpha", 0.003);
    let config = config_with_default(Some("alpha"));
    let (orchestrator, recorder) = orchestrator_with(vec![alpha], &config);

    let n = 4;
    for i in 0..n {
        orchestrator
            .generate(&format!("prompt {}", i), None, None, GenerationOptions::default())
            .await
            .unwrap();
    }

    let bucket = recorder
        .bucket("alpha", "alpha-large", Granularity::Hour)
        .expect("bucket recorded");
    assert_eq!(bucket.request_count, n);
    assert_eq!(bucket.success_count, n);
    assert!((bucket.total_cost - 0.003 * n as f64).abs() < 1e-9);
    assert_eq!(bucket.cached_count, 0);
}

#[tokio::test]
async fn test_cache_hit_still_records_usage() {
    let alpha = MockAdapter::ok("alpha", 0.002);
    let config = config_with_default(Some("alpha"));
    let (orchestrator, recorder) = orchestrator_with(vec![alpha], &config);

    for _ in 0..3 {
        orchestrator
            .generate("same", None, None, GenerationOptions::default())
            .await
            .unwrap();
    }

    let bucket = recorder
        .bucket("alpha", "alpha-large", Granularity::Hour)
        .unwrap();
    // one real dispatch plus two hits, each a usage event
    assert_eq!(bucket.request_count, 3);
    assert_eq!(bucket.cached_count, 2);
    assert!((bucket.cache_hit_rate() - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_failed_generation_records_failure_event() {
    let alpha = MockAdapter::failing("alpha");
    let config = config_with_default(Some("alpha"));
    let (orchestrator, recorder) = orchestrator_with(vec![alpha], &config);

    let _ = orchestrator
        .generate("hi", None, None, GenerationOptions::default())
        .await
        .unwrap_err();

    let bucket = recorder
        .bucket("alpha", "alpha-large", Granularity::Hour)
        .unwrap();
    assert_eq!(bucket.failure_count, 1);
    assert_eq!(bucket.total_cost, 0.0);
}

#[tokio::test]
async fn test_recorder_failure_never_masks_generation() {
    let mut registry = AdapterRegistry::new();
    registry.register(MockAdapter::ok("alpha", 0.001));
    let config = config_with_default(Some("alpha"));
    let orchestrator = Orchestrator::new(registry, Arc::new(FailingRecorder), &config);

    let response = orchestrator
        .generate("hi", None, None, GenerationOptions::default())
        .await
        .expect("generation survives a dead ledger");
    assert_eq!(response.text, "echo: hi");

    // history degrades to empty rather than erroring
    assert!(orchestrator.history("any", None).await.is_empty());
}

#[tokio::test]
async fn test_estimate_cost_unregistered_is_zero() {
    let (orchestrator, _) = orchestrator_with(
        vec![MockAdapter::ok("alpha", 0.009)],
        &config_with_default(None),
    );

    let known = orchestrator
        .estimate_cost("hello world", "alpha", None, GenerationOptions::default())
        .await;
    assert!((known - 0.009).abs() < 1e-12);

    let unknown = orchestrator
        .estimate_cost("hello world", "ghost", None, GenerationOptions::default())
        .await;
    assert_eq!(unknown, 0.0);
}

#[tokio::test]
async fn test_health_check_probes_every_provider() {
    let healthy = MockAdapter::ok("alpha", 0.0);
    let broken = MockAdapter::failing("beta");
    let (orchestrator, recorder) = orchestrator_with(
        vec![healthy.clone(), broken.clone()],
        &config_with_default(None),
    );

    let report = orchestrator.health_check().await;
    assert_eq!(report.len(), 2);
    assert_eq!(report["alpha"], true);
    assert_eq!(report["beta"], false);

    // probes are real invocations and count as usage
    assert_eq!(healthy.call_count(), 1);
    assert!(recorder.bucket("alpha", "alpha-large", Granularity::Hour).is_some());
    assert!(recorder.bucket("beta", "beta-large", Granularity::Hour).is_some());
}

#[tokio::test]
async fn test_session_turns_are_recorded() {
    let alpha = MockAdapter::ok("alpha", 0.001);
    let config = config_with_default(Some("alpha"));
    let (orchestrator, _) = orchestrator_with(vec![alpha], &config);

    let options = GenerationOptions {
        context: Some(RequestContext::new().with_session_id("chat-42")),
        ..Default::default()
    };
    orchestrator
        .generate("first question", None, None, options)
        .await
        .unwrap();

    let history = orchestrator.history("chat-42", None).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].content, "first question");
    assert_eq!(history[1].role, MessageRole::Assistant);
    assert_eq!(history[1].provider.as_deref(), Some("alpha"));
    assert!(history[1].cost.is_some());
}

#[tokio::test]
async fn test_available_surfaces() {
    let (orchestrator, _) = orchestrator_with(
        vec![MockAdapter::ok("alpha", 0.0), MockAdapter::ok("beta", 0.0)],
        &config_with_default(None),
    );

    assert_eq!(orchestrator.available_providers(), vec!["alpha", "beta"]);
    let models = orchestrator.available_models("alpha").await.unwrap();
    assert_eq!(models, vec!["alpha-large", "alpha-small"]);
    assert!(matches!(
        orchestrator.available_models("ghost").await.unwrap_err(),
        OrchestratorError::UnknownProvider(_)
    ));
}

//! Generation request types
//!
//! A single request shape shared by every provider adapter. Adapters
//! translate this into their own wire format; the cache fingerprints it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of a message within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One prior message carried in the request context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Optional context bundle attached to a request
///
/// `extras` is a key-sorted map so that two contexts built with the same
/// entries in different insertion order serialize (and fingerprint)
/// identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// System instruction; placement on the wire is provider-specific
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Prior turns, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatTurn>,
    /// Provider-specific extras (search filters, etc.)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, serde_json::Value>,
    /// External session identifier for conversation recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Sampling parameters and flags for a generation call
///
/// The orchestrator fills unset fields from its configured defaults before
/// dispatching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature, conventionally in [0, 2]
    pub temperature: Option<f32>,
    /// Maximum output tokens
    pub max_tokens: Option<u32>,
    /// Nucleus sampling probability mass, in [0, 1]
    pub top_p: Option<f32>,
    /// Request streamed generation; the adapter still returns one
    /// materialized response
    #[serde(default)]
    pub stream: bool,
    /// Optional context bundle
    pub context: Option<RequestContext>,
}

/// The uniform generation request handed to adapters
///
/// Immutable once constructed; the same value is used for dispatch and for
/// cache fingerprinting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            stream: false,
            context: None,
        }
    }

    pub fn from_options(
        prompt: impl Into<String>,
        model: impl Into<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stream: options.stream,
            context: options.context,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Prior history followed by the new user turn, order preserved.
    ///
    /// System-instruction placement differs per provider, so the system
    /// entry is NOT included here; adapters place it themselves.
    pub fn conversation(&self) -> Vec<ChatTurn> {
        let mut turns = self
            .context
            .as_ref()
            .map(|c| c.history.clone())
            .unwrap_or_default();
        turns.push(ChatTurn::new(MessageRole::User, self.prompt.clone()));
        turns
    }

    /// System instruction from the context bundle, if any
    pub fn system_instruction(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.system.as_deref())
    }

    /// Session identifier from the context bundle, if any
    pub fn session_id(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.session_id.as_deref())
    }

    /// Provider-specific extra by key
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.as_ref().and_then(|c| c.extras.get(key))
    }
}

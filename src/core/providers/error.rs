//! Unified provider error handling
//!
//! Single error type for all adapters. Variants carry the provider tag and
//! enough upstream detail (status, retry hints) for callers to tell auth
//! from quota from transient failures.

use thiserror::Error;

/// Error raised by a provider adapter during a generation call
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Authentication failed for {provider}: {message}")]
    Authentication {
        provider: &'static str,
        message: String,
    },

    #[error("Rate limit exceeded for {provider}: {message}")]
    RateLimit {
        provider: &'static str,
        message: String,
        retry_after: Option<u64>,
    },

    #[error("API error for {provider} (status {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Network error for {provider}: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    #[error("Timeout for {provider}: {message}")]
    Timeout {
        provider: &'static str,
        message: String,
    },

    #[error("Failed to parse {provider} response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    #[error("Empty completion from {provider} for model {model}")]
    EmptyCompletion {
        provider: &'static str,
        model: String,
    },

    #[error("Invalid request for {provider}: {message}")]
    InvalidRequest {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn authentication(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider,
            message: message.into(),
        }
    }

    pub fn rate_limit(provider: &'static str, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            provider,
            message: match retry_after {
                Some(secs) => format!("retry after {} seconds", secs),
                None => "retry later".to_string(),
            },
            retry_after,
        }
    }

    pub fn api(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn network(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Network {
            provider,
            message: message.into(),
        }
    }

    pub fn timeout(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Timeout {
            provider,
            message: message.into(),
        }
    }

    pub fn parse(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            provider,
            message: message.into(),
        }
    }

    pub fn empty_completion(provider: &'static str, model: impl Into<String>) -> Self {
        Self::EmptyCompletion {
            provider,
            model: model.into(),
        }
    }

    pub fn invalid_request(provider: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            provider,
            message: message.into(),
        }
    }

    /// The provider this error originated from
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Authentication { provider, .. }
            | Self::RateLimit { provider, .. }
            | Self::Api { provider, .. }
            | Self::Network { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Parse { provider, .. }
            | Self::EmptyCompletion { provider, .. }
            | Self::InvalidRequest { provider, .. } => provider,
        }
    }

    /// Upstream HTTP status, where one was observed
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            Self::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the same call could plausibly succeed if repeated.
    ///
    /// This layer never retries; the hint is for callers deciding whether
    /// a fallback chain is worth invoking.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimit { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Map an HTTP error status + body to the matching variant.
///
/// Shared by adapters whose upstream speaks conventional status codes.
pub fn map_http_status(provider: &'static str, status: u16, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::authentication(provider, truncate(body, 200)),
        429 => ProviderError::rate_limit(provider, extract_retry_after(body)),
        400 => ProviderError::invalid_request(provider, truncate(body, 200)),
        _ => ProviderError::api(provider, status, truncate(body, 200)),
    }
}

/// Pull a retry_after hint out of an error body, tolerating either a
/// top-level field or one nested under "error"
fn extract_retry_after(body: &str) -> Option<u64> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("retry_after")
        .or_else(|| json.get("error").and_then(|e| e.get("retry_after")))
        .and_then(|v| v.as_u64())
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = map_http_status("openai", 401, "bad key");
        assert!(matches!(err, ProviderError::Authentication { .. }));
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_retryable());

        let err = map_http_status("openai", 429, r#"{"retry_after": 30}"#);
        match &err {
            ProviderError::RateLimit { retry_after, .. } => assert_eq!(*retry_after, Some(30)),
            other => panic!("expected rate limit, got {:?}", other),
        }
        assert!(err.is_retryable());

        let err = map_http_status("anthropic", 503, "overloaded");
        assert!(err.is_retryable());
        assert_eq!(err.provider(), "anthropic");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ünïcödé".repeat(100);
        let err = map_http_status("ollama", 500, &text);
        let message = err.to_string();
        assert!(message.len() < text.len());
    }
}

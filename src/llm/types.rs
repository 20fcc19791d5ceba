//! Client trait, request parameters and error classification

use async_trait::async_trait;
use thiserror::Error;

/// Sampling parameters for a single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    /// Optional system message sent ahead of the prompt
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            system: None,
            temperature: 0.3,
            max_tokens: Some(2000),
        }
    }
}

impl CompletionParams {
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Every field that shapes a reply, as text for cache keys
    pub fn fingerprint(&self) -> String {
        format!(
            "temperature={};max_tokens={};system={}",
            self.temperature,
            self.max_tokens
                .map_or_else(|| "none".to_string(), |t| t.to_string()),
            self.system.as_deref().unwrap_or(""),
        )
    }
}

/// Errors from chat-completion calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("response parse error: {0}")]
    Parse(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_)
                | LlmError::Server { .. }
                | LlmError::Network(_)
                | LlmError::Timeout(_)
        )
    }

    /// Whether the request was refused outright. Callers stop rather
    /// than carry on with partial results.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LlmError::Authentication(_)
                | LlmError::QuotaExceeded(_)
                | LlmError::InvalidRequest(_)
                | LlmError::ModelNotFound(_)
        )
    }

    /// Classify a non-2xx HTTP response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = truncate(body, 300);
        match status {
            401 | 403 => LlmError::Authentication(message),
            429 if body.contains("insufficient_quota") => LlmError::QuotaExceeded(message),
            429 => LlmError::RateLimited(message),
            400 | 413 | 422 => LlmError::InvalidRequest(message),
            404 => LlmError::ModelNotFound(message),
            408 => LlmError::Timeout(message),
            500..=599 => LlmError::Server { status, message },
            _ => LlmError::InvalidRequest(format!("HTTP {}: {}", status, message)),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// A chat-completion backend.
///
/// Abstracts over transport (HTTP, scripted) so the analyzer and the
/// insight generator don't depend on how the model is reached.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` to `model` and return the reply text.
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        params: &CompletionParams,
    ) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(LlmError::from_status(401, "bad key"), LlmError::Authentication(_)));
        assert!(matches!(LlmError::from_status(403, "nope"), LlmError::Authentication(_)));
        assert!(matches!(LlmError::from_status(429, "slow down"), LlmError::RateLimited(_)));
        assert!(matches!(
            LlmError::from_status(429, r#"{"error":{"code":"insufficient_quota"}}"#),
            LlmError::QuotaExceeded(_)
        ));
        assert!(matches!(LlmError::from_status(400, "bad"), LlmError::InvalidRequest(_)));
        assert!(matches!(LlmError::from_status(404, "gpt-9"), LlmError::ModelNotFound(_)));
        assert!(matches!(
            LlmError::from_status(503, "overloaded"),
            LlmError::Server { status: 503, .. }
        ));
    }

    #[test]
    fn transient_errors_are_not_fatal() {
        let transient = [
            LlmError::RateLimited("x".into()),
            LlmError::Server { status: 500, message: "x".into() },
            LlmError::Network("x".into()),
            LlmError::Timeout("x".into()),
        ];
        for err in transient {
            assert!(err.is_transient(), "{err} should be transient");
            assert!(!err.is_fatal(), "{err} should not be fatal");
        }

        let permanent = [
            LlmError::Authentication("x".into()),
            LlmError::QuotaExceeded("x".into()),
            LlmError::InvalidRequest("context_length_exceeded".into()),
            LlmError::ModelNotFound("x".into()),
        ];
        for err in permanent {
            assert!(!err.is_transient());
            assert!(err.is_fatal());
        }

        let parse = LlmError::Parse("x".into());
        assert!(!parse.is_transient());
        assert!(!parse.is_fatal());
    }

    #[test]
    fn fingerprint_tracks_every_field() {
        let base = CompletionParams::default();
        assert_eq!(base.fingerprint(), CompletionParams::default().fingerprint());
        assert_ne!(base.fingerprint(), base.clone().with_temperature(0.9).fingerprint());
        assert_ne!(base.fingerprint(), base.clone().with_max_tokens(10).fingerprint());
        assert_ne!(base.fingerprint(), base.clone().with_system("be brief").fingerprint());
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        match LlmError::from_status(500, &body) {
            LlmError::Server { message, .. } => assert!(message.len() < 400),
            other => panic!("unexpected {other:?}"),
        }
    }
}

//! Generative model client abstraction.
//!
//! The question flow needs exactly one operation from a model: turn a prompt into
//! text. Providers report failures as an [`UpstreamError`] kind so the gateway can
//! decide what the visitor sees without inspecting provider-specific messages.

mod gemini;
pub mod grounding;

pub use gemini::GeminiClient;
pub use grounding::{REFUSAL_SENTENCE, build_grounded_prompt};

use std::time::Duration;
use thiserror::Error as ThisError;

/// Trait for generative model providers.
///
/// Calls are blocking; async callers must run them on a blocking thread.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates text for the given prompt in a single, stateless call.
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] describing why no usable text was produced.
    fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Why a provider call produced no usable text.
///
/// The payloads are for server-side logs only.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum UpstreamError {
    /// No API key is configured.
    #[error("API key not configured")]
    NotConfigured,
    /// The request or connection timed out.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The API answered with a non-success status.
    #[error("API returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
    /// The prompt was blocked by the provider's safety filters.
    #[error("prompt blocked: {0}")]
    Blocked(String),
    /// The response contained no text.
    #[error("empty response")]
    Empty,
}

impl UpstreamError {
    /// Returns a stable label for metrics and logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::Blocked(_) => "blocked",
            Self::Empty => "empty",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// HTTP client configuration for model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Loads HTTP configuration from config file settings.
    #[must_use]
    pub fn from_config(config: &crate::config::LlmConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build LLM HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_defaults() {
        let config = LlmHttpConfig::default();
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.connect_timeout_ms, 3_000);
    }

    #[test]
    fn test_http_config_from_llm_config() {
        let llm = crate::config::LlmConfig {
            timeout_ms: 5_000,
            connect_timeout_ms: 500,
            ..Default::default()
        };
        assert_eq!(
            LlmHttpConfig::from_config(&llm),
            LlmHttpConfig {
                timeout_ms: 5_000,
                connect_timeout_ms: 500,
            }
        );
    }

    #[test]
    fn test_upstream_labels() {
        assert_eq!(UpstreamError::Empty.as_label(), "empty");
        assert_eq!(UpstreamError::Timeout("t".into()).as_label(), "timeout");
        assert_eq!(
            UpstreamError::Status {
                status: 503,
                body: String::new()
            }
            .as_label(),
            "status"
        );
    }
}

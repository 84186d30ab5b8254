//! Google Gemini client.

use super::{LlmHttpConfig, LlmProvider, UpstreamError, build_http_client};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// API key.
    api_key: Option<SecretString>,
    /// API base URL.
    base_url: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";

    /// Environment variable holding the API key.
    pub const API_KEY_ENV: &'static str = "GEMINI_API_KEY";

    /// Creates a new client, reading the API key from `GEMINI_API_KEY`.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var(Self::API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);
        Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(LlmHttpConfig::default()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the API key from an already wrapped secret.
    #[must_use]
    pub fn with_secret_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Returns true if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Returns the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let api_key = self.api_key.as_ref().ok_or(UpstreamError::NotConfigured)?;

        let response = self
            .client
            .post(self.endpoint_url())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&GenerateContentRequest::user_text(prompt))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: GenerateContentResponse = response.json()?;
        response.into_text()
    }
}

/// Request to the `generateContent` API.
#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

impl<'a> GenerateContentRequest<'a> {
    fn user_text(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

/// A message in the request.
#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

/// A text part in the request.
#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Response from the `generateContent` API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    fn into_text(self) -> Result<String, UpstreamError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(self
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .map_or(UpstreamError::Empty, UpstreamError::Blocked));
        };

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(UpstreamError::Empty);
        }
        Ok(text)
    }
}

/// A response candidate.
#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

/// Content inside a candidate.
#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

/// A part inside candidate content; non-text parts carry no `text`.
#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Safety feedback about the prompt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String, UpstreamError> {
        serde_json::from_str::<GenerateContentResponse>(json)
            .unwrap()
            .into_text()
    }

    #[test]
    fn test_client_configuration() {
        let client = GeminiClient::new()
            .with_api_key("test-key")
            .with_base_url("https://custom.endpoint/v1/")
            .with_model("gemini-2.0-flash");

        assert_eq!(client.name(), "gemini");
        assert!(client.has_api_key());
        assert_eq!(client.model(), "gemini-2.0-flash");
        assert_eq!(
            client.endpoint_url(),
            "https://custom.endpoint/v1/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let client = GeminiClient {
            api_key: None,
            base_url: GeminiClient::DEFAULT_BASE_URL.to_string(),
            model: GeminiClient::DEFAULT_MODEL.to_string(),
            client: reqwest::blocking::Client::new(),
        };
        assert_eq!(client.generate("prompt"), Err(UpstreamError::NotConfigured));
    }

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(GenerateContentRequest::user_text("hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn test_text_parts_concatenated() {
        let text = parse(
            r#"{"candidates": [{"content": {"parts": [{"text": "Hello, "}, {"text": "world"}], "role": "model"}, "finishReason": "STOP"}]}"#,
        );
        assert_eq!(text.as_deref(), Ok("Hello, world"));
    }

    #[test]
    fn test_only_first_candidate_used() {
        let text = parse(
            r#"{"candidates": [{"content": {"parts": [{"text": "first"}]}}, {"content": {"parts": [{"text": "second"}]}}]}"#,
        );
        assert_eq!(text.as_deref(), Ok("first"));
    }

    #[test]
    fn test_blank_text_is_empty() {
        assert_eq!(
            parse(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#),
            Err(UpstreamError::Empty)
        );
        assert_eq!(
            parse(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#),
            Err(UpstreamError::Empty)
        );
        assert_eq!(parse("{}"), Err(UpstreamError::Empty));
    }

    #[test]
    fn test_blocked_prompt() {
        assert_eq!(
            parse(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#),
            Err(UpstreamError::Blocked("SAFETY".to_string()))
        );
    }
}

//! Grounded question answering.
//!
//! The gateway validates a question, looks up the item, builds the grounding prompt
//! and makes one model call. Model failures never reach the visitor as errors: they
//! become one of two fixed fallback answers, while the detail goes to the log.

use super::{ContentStore, build_context};
use crate::llm::{LlmProvider, UpstreamError, build_grounded_prompt};
use crate::models::{AskError, AskRequest, ContentItem};
use std::sync::Arc;
use std::time::Instant;

/// Maximum question length in characters, after trimming.
pub const MAX_QUERY_CHARS: usize = 1000;

/// Minimum question length in characters, after trimming.
pub const MIN_QUERY_CHARS: usize = 3;

/// Answer shown when the model returned no text.
pub const EMPTY_ANSWER_FALLBACK: &str =
    "I apologize, but I couldn't generate a response. Please try rephrasing your question.";

/// Answer shown for any other upstream failure.
pub const UNAVAILABLE_FALLBACK: &str =
    "I'm having trouble connecting to the AI service right now. Please try again in a moment.";

/// Maps an upstream failure to the answer the visitor sees.
#[must_use]
pub const fn fallback_for(err: &UpstreamError) -> &'static str {
    match err {
        UpstreamError::Empty => EMPTY_ANSWER_FALLBACK,
        UpstreamError::NotConfigured
        | UpstreamError::Timeout(_)
        | UpstreamError::Transport(_)
        | UpstreamError::Status { .. }
        | UpstreamError::Decode(_)
        | UpstreamError::Blocked(_) => UNAVAILABLE_FALLBACK,
    }
}

/// Answers visitor questions about one content item at a time.
#[derive(Clone)]
pub struct QaGateway {
    store: Arc<ContentStore>,
    provider: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for QaGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaGateway")
            .field("items", &self.store.len())
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl QaGateway {
    /// Creates a gateway over a store and a model provider.
    #[must_use]
    pub fn new(store: Arc<ContentStore>, provider: Arc<dyn LlmProvider>) -> Self {
        Self { store, provider }
    }

    /// Returns the content store.
    #[must_use]
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Validates a question and resolves its item.
    ///
    /// Checks run in order: presence, maximum length, minimum length, item lookup.
    /// Returns the item and the trimmed query.
    ///
    /// # Errors
    ///
    /// Returns the first [`AskError`] that applies.
    pub fn validate<'a>(
        &self,
        item_id: &str,
        query: &'a str,
    ) -> Result<(&ContentItem, &'a str), AskError> {
        let item_id = item_id.trim();
        let query = query.trim();
        if item_id.is_empty() || query.is_empty() {
            return Err(AskError::MissingInput);
        }

        let chars = query.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(AskError::QueryTooLong);
        }
        if chars < MIN_QUERY_CHARS {
            return Err(AskError::QueryTooShort);
        }

        let item = self.store.lookup(item_id).ok_or(AskError::ItemNotFound)?;
        Ok((item, query))
    }

    /// Answers a question about one item.
    ///
    /// Blocks for the duration of the model call.
    ///
    /// # Errors
    ///
    /// Returns a validation [`AskError`]. Upstream failures are returned as a
    /// fallback answer, not as an error.
    pub fn answer(&self, item_id: &str, query: &str) -> Result<String, AskError> {
        let (item, query) = self.validate(item_id, query)?;
        let prompt = build_grounded_prompt(&build_context(item), query);

        match self.generate(&item.id, &prompt) {
            Ok(text) => Ok(text),
            Err(err) => Ok(fallback_for(&err).to_string()),
        }
    }

    /// Answers a parsed request body.
    ///
    /// # Errors
    ///
    /// Returns [`AskError::MissingInput`] if either field is absent, otherwise as
    /// [`Self::answer`].
    pub fn answer_request(&self, request: &AskRequest) -> Result<String, AskError> {
        match (request.item_id.as_deref(), request.query.as_deref()) {
            (Some(item_id), Some(query)) => self.answer(item_id, query),
            _ => Err(AskError::MissingInput),
        }
    }

    fn generate(&self, item_id: &str, prompt: &str) -> Result<String, UpstreamError> {
        let provider = self.provider.name();
        let span = tracing::info_span!(
            "llm.request",
            provider = provider,
            item_id = item_id,
            status = tracing::field::Empty,
            error = tracing::field::Empty
        );
        let _enter = span.enter();

        let start = Instant::now();
        let result = self.provider.generate(prompt);
        let elapsed = start.elapsed();

        let status = match &result {
            Ok(_) => "success",
            Err(err) => err.as_label(),
        };
        span.record("status", status);

        metrics::counter!(
            "llm_requests_total",
            "provider" => provider,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "llm_request_duration_ms",
            "provider" => provider,
            "status" => status
        )
        .record(elapsed.as_secs_f64() * 1000.0);

        if let Err(err) = &result {
            span.record("error", tracing::field::display(err));
            tracing::error!(
                error = %err,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Model call failed, returning fallback answer"
            );
        }
        result
    }
}

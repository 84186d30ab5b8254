//! Request, response and error shapes for the AI question endpoint.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Body of `POST /ask_ai`.
///
/// Both fields are optional at the wire level so that `{}` parses and is reported as
/// missing input rather than a malformed body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AskRequest {
    /// Id of the item the question is about.
    #[serde(default)]
    pub item_id: Option<String>,
    /// The visitor's question.
    #[serde(default)]
    pub query: Option<String>,
}

impl AskRequest {
    /// Creates a request with both fields set.
    #[must_use]
    pub fn new(item_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            query: Some(query.into()),
        }
    }

    /// Parses a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`AskError::MalformedRequest`] if the body is not a JSON object whose
    /// `item_id` and `query` fields are strings, null, or absent.
    pub fn from_slice(body: &[u8]) -> Result<Self, AskError> {
        // Struct derives also accept sequences, so require an object first.
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejecting non-object ask body");
                AskError::MalformedRequest
            })?;

        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
            tracing::debug!(error = %e, "Rejecting malformed ask body");
            AskError::MalformedRequest
        })
    }
}

/// Successful answer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    /// Answer text shown to the visitor.
    pub response: String,
}

/// Error payload for every non-200 JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Visitor-facing message.
    pub error: String,
}

/// Visitor-facing failures of the question flow.
///
/// Upstream model failures are not represented here: they are absorbed into a
/// fallback answer by the gateway.
///
/// | Variant | Status |
/// |---------|--------|
/// | `MissingInput` | 400 |
/// | `MalformedRequest` | 400 |
/// | `QueryTooLong` | 400 |
/// | `QueryTooShort` | 400 |
/// | `ItemNotFound` | 404 |
/// | `RateLimited` | 429 |
/// | `Internal` | 500 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum AskError {
    /// `item_id` or `query` absent or blank after trimming.
    #[error("Missing item_id or query")]
    MissingInput,
    /// Body is not a JSON object of the expected shape.
    #[error("Invalid request format")]
    MalformedRequest,
    /// Trimmed query exceeds the maximum length.
    #[error("Question is too long. Please keep it under 1000 characters.")]
    QueryTooLong,
    /// Trimmed query is below the minimum length.
    #[error("Question is too short. Please provide more detail.")]
    QueryTooShort,
    /// No content item has the given id.
    #[error("Item not found")]
    ItemNotFound,
    /// The session exhausted its quota for the current window.
    #[error("Rate limit exceeded. Please wait a few minutes before asking more questions.")]
    RateLimited,
    /// Anything unexpected (worker panic, runtime shutdown).
    #[error("An unexpected error occurred. Please try again.")]
    Internal,
}

impl AskError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::MissingInput
            | Self::MalformedRequest
            | Self::QueryTooLong
            | Self::QueryTooShort => 400,
            Self::ItemNotFound => 404,
            Self::RateLimited => 429,
            Self::Internal => 500,
        }
    }

    /// Returns a stable label for metrics and logs.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::MalformedRequest => "malformed_request",
            Self::QueryTooLong => "query_too_long",
            Self::QueryTooShort => "query_too_short",
            Self::ItemNotFound => "item_not_found",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal",
        }
    }

    /// Builds the JSON error payload.
    #[must_use]
    pub fn to_body(self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_empty_object_parses() {
        let request = AskRequest::from_slice(b"{}").unwrap();
        assert_eq!(request, AskRequest::default());
    }

    #[test]
    fn test_extra_fields_ignored() {
        let request =
            AskRequest::from_slice(br#"{"item_id": "paper_x", "query": "Why?", "lang": "en"}"#)
                .unwrap();
        assert_eq!(request, AskRequest::new("paper_x", "Why?"));
    }

    #[test]
    fn test_null_fields_parse_as_absent() {
        let request = AskRequest::from_slice(br#"{"item_id": null, "query": "hi"}"#).unwrap();
        assert!(request.item_id.is_none());
        assert_eq!(request.query.as_deref(), Some("hi"));
    }

    #[test_case(b"not json"; "not json")]
    #[test_case(b"[]"; "array")]
    #[test_case(br#"["paper_x", "What is X?"]"#; "positional array")]
    #[test_case(br#"[null, null]"#; "array of nulls")]
    #[test_case(b"\"text\""; "string")]
    #[test_case(b""; "empty body")]
    #[test_case(br#"{"item_id": 7, "query": "What is it?"}"#; "numeric id")]
    fn test_malformed_bodies(body: &[u8]) {
        assert_eq!(AskRequest::from_slice(body), Err(AskError::MalformedRequest));
    }

    #[test_case(AskError::MissingInput, 400)]
    #[test_case(AskError::MalformedRequest, 400)]
    #[test_case(AskError::QueryTooLong, 400)]
    #[test_case(AskError::QueryTooShort, 400)]
    #[test_case(AskError::ItemNotFound, 404)]
    #[test_case(AskError::RateLimited, 429)]
    #[test_case(AskError::Internal, 500)]
    fn test_status_codes(err: AskError, status: u16) {
        assert_eq!(err.status_code(), status);
    }

    #[test]
    fn test_error_body() {
        let body = serde_json::to_value(AskError::ItemNotFound.to_body()).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Item not found"}));
    }
}

//! # Folio
//!
//! Portfolio content server with a context-grounded AI question endpoint.
//!
//! Folio loads a flat list of projects and research papers from a JSON file once at
//! startup, serves read-only views of them over HTTP, and answers visitor questions
//! about a single item through a generative model that is instructed to use only that
//! item's fields.
//!
//! ## Features
//!
//! - Immutable in-memory content store partitioned into projects and research papers
//! - Per-session fixed-window rate limiting for AI questions
//! - Strict grounding prompt with a prescribed refusal sentence
//! - Upstream failures normalized into a displayable fallback answer
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio::llm::GeminiClient;
//! use folio::services::{ContentStore, QaGateway};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(ContentStore::load(Path::new("data/content.json"))?);
//! let gateway = QaGateway::new(store, Arc::new(GeminiClient::new()));
//! let answer = gateway.answer("paper_x", "What is X?")?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod llm;
pub mod models;
pub mod observability;
pub mod server;
pub mod services;

// Re-exports for convenience
pub use config::FolioConfig;
pub use llm::{GeminiClient, LlmProvider, UpstreamError};
pub use models::{AskError, AskRequest, ContentItem, ContentKind};
pub use services::{ContentStore, QaGateway, RateDecision, RateLimiter};

/// Error type for folio operations.
///
/// Visitor-facing validation failures use [`AskError`]; this type covers startup,
/// configuration and content loading.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Content file has duplicate ids, missing required fields, bad config values |
/// | `OperationFailed` | I/O errors, JSON/TOML parse failures, socket bind, runtime setup |
/// | `NotFound` | A named content item does not exist (CLI `ask`) |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - Two content items share an id
    /// - A content item lacks an `id` or `title`
    /// - A configuration value cannot be interpreted
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - The content or config file cannot be read or parsed
    /// - The HTTP listener cannot bind
    /// - Observability initialization fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type alias for folio operations.
pub type Result<T> = std::result::Result<T, Error>;

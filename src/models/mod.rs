//! Data models for folio.
//!
//! Content records loaded from the JSON source and the request/response shapes of
//! the AI question endpoint.

mod ask;
mod content;

pub use ask::{AskError, AskRequest, AskResponse, ErrorBody};
pub use content::{ContentItem, ContentKind, ItemView, RESEARCH_ID_PREFIX};

//! Business logic services.
//!
//! Services own the question-answering flow: content lookup, per-session rate
//! limiting, context assembly and the grounded model call.

mod content;
mod context;
mod gateway;
mod rate_limit;

pub use content::ContentStore;
pub use context::build_context;
pub use gateway::{
    EMPTY_ANSWER_FALLBACK, MAX_QUERY_CHARS, MIN_QUERY_CHARS, QaGateway, UNAVAILABLE_FALLBACK,
    fallback_for,
};
pub use rate_limit::{RateDecision, RateLimitConfig, RateLimiter, SessionRateState};

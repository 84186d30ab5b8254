//! Route handlers.

use super::AppState;
use super::session::resolve_session;
use crate::models::{AskError, AskRequest, AskResponse, ItemView};
use crate::observability::{RequestContext, current_request_id, enter_request_context};
use crate::services::RateDecision;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

/// `POST /ask_ai`.
///
/// The session quota is checked and consumed before the body is parsed, so malformed
/// and invalid requests count against it too.
pub async fn ask_ai(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> Response {
    let (jar, session) = resolve_session(jar, state.secure_cookies);

    if let RateDecision::Rejected { retry_after } = state.limiter.check_and_increment(&session) {
        metrics::counter!("ask_ai_rate_limited_total").increment(1);
        record_outcome(AskError::RateLimited.as_label());
        let mut response = AskError::RateLimited.into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return (jar, response).into_response();
    }

    let result = match AskRequest::from_slice(&body) {
        Ok(request) => answer(&state, request).await,
        Err(err) => Err(err),
    };

    let response = match result {
        Ok(text) => {
            record_outcome("answered");
            Json(AskResponse { response: text }).into_response()
        },
        Err(err) => {
            record_outcome(err.as_label());
            tracing::debug!(error = %err, "Question rejected");
            err.into_response()
        },
    };
    (jar, response).into_response()
}

/// Runs the blocking gateway call off the async workers.
async fn answer(state: &AppState, request: AskRequest) -> Result<String, AskError> {
    let gateway = state.gateway.clone();
    let context = current_request_id().map_or_else(RequestContext::new, RequestContext::from_id);

    tokio::task::spawn_blocking(move || {
        let _guard = enter_request_context(context);
        gateway.answer_request(&request)
    })
    .await
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Question worker failed");
        Err(AskError::Internal)
    })
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("ask_ai_requests_total", "outcome" => outcome).increment(1);
}

/// Health payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
}

/// `GET /health`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Featured items for the index view.
#[derive(Debug, Serialize)]
pub struct FeaturedResponse<'a> {
    /// Featured projects, in configured order.
    pub projects: Vec<ItemView<'a>>,
    /// Featured research papers, in configured order.
    pub research_papers: Vec<ItemView<'a>>,
}

/// `GET /api/featured`.
pub async fn featured(State(state): State<AppState>) -> Response {
    let store = state.gateway.store();
    let body = FeaturedResponse {
        projects: views(store.featured(state.featured.projects.as_slice())),
        research_papers: views(store.featured(state.featured.research.as_slice())),
    };
    Json(body).into_response()
}

/// `GET /api/projects`.
pub async fn projects(State(state): State<AppState>) -> Response {
    let items: Vec<ItemView<'_>> = state
        .gateway
        .store()
        .projects()
        .map(ItemView::from)
        .collect();
    Json(items).into_response()
}

/// `GET /api/research`.
pub async fn research(State(state): State<AppState>) -> Response {
    let items: Vec<ItemView<'_>> = state
        .gateway
        .store()
        .research()
        .map(ItemView::from)
        .collect();
    Json(items).into_response()
}

/// Chat modal payload.
#[derive(Debug, Serialize)]
pub struct ChatModalResponse<'a> {
    /// Item id.
    pub item_id: &'a str,
    /// Item title.
    pub item_title: &'a str,
}

/// `GET /ai_chat_modal/{item_id}`.
pub async fn ai_chat_modal(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Response {
    state.gateway.store().lookup(&item_id).map_or_else(
        || AskError::ItemNotFound.into_response(),
        |item| {
            Json(ChatModalResponse {
                item_id: &item.id,
                item_title: &item.title,
            })
            .into_response()
        },
    )
}

fn views(items: Vec<&crate::models::ContentItem>) -> Vec<ItemView<'_>> {
    items.into_iter().map(ItemView::from).collect()
}

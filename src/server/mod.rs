//! HTTP server.
//!
//! Routes:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/ask_ai` | grounded question about one item |
//! | GET | `/health` | liveness |
//! | GET | `/api/featured` | featured projects and papers |
//! | GET | `/api/projects` | all projects |
//! | GET | `/api/research` | all research papers |
//! | GET | `/ai_chat_modal/{item_id}` | item title for the chat dialog |
//!
//! Anything else falls through to the static asset directory, if one is configured.

mod error;
mod handlers;
mod session;

pub use handlers::{ChatModalResponse, FeaturedResponse, HealthResponse};
pub use error::PAYLOAD_TOO_LARGE_MESSAGE;
pub use session::{SESSION_COOKIE, resolve_session};

use crate::config::{FeaturedConfig, FolioConfig};
use crate::llm::LlmProvider;
use crate::services::{ContentStore, QaGateway, RateLimiter};
use crate::{Error, Result};
use axum::Router;
use axum::http::{HeaderValue, header};
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body size.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state for every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Question gateway; also owns the content store.
    pub gateway: QaGateway,
    /// Per-session question limiter.
    pub limiter: Arc<RateLimiter>,
    /// Featured ids for the index view.
    pub featured: Arc<FeaturedConfig>,
    /// Whether session cookies are marked `Secure`.
    pub secure_cookies: bool,
}

impl AppState {
    /// Builds state from its parts.
    #[must_use]
    pub fn new(gateway: QaGateway, limiter: Arc<RateLimiter>) -> Self {
        Self {
            gateway,
            limiter,
            featured: Arc::new(FeaturedConfig::default()),
            secure_cookies: false,
        }
    }

    /// Builds state from configuration, a loaded store and a model provider.
    #[must_use]
    pub fn from_config(
        config: &FolioConfig,
        store: Arc<ContentStore>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            gateway: QaGateway::new(store, provider),
            limiter: Arc::new(RateLimiter::new(config.rate_limit.to_limiter_config())),
            featured: Arc::new(config.featured.clone()),
            secure_cookies: config.server.secure_cookies,
        }
    }

    /// Sets the featured ids.
    #[must_use]
    pub fn with_featured(mut self, featured: FeaturedConfig) -> Self {
        self.featured = Arc::new(featured);
        self
    }
}

/// Builds the application router.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let ask = post(handlers::ask_ai).layer(SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    ));

    let mut app = Router::new()
        .route("/ask_ai", ask)
        .route("/health", get(handlers::health))
        .route("/api/featured", get(handlers::featured))
        .route("/api/projects", get(handlers::projects))
        .route("/api/research", get(handlers::research))
        .route("/ai_chat_modal/{item_id}", get(handlers::ai_chat_modal));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(axum::middleware::map_response(error::json_payload_too_large))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            crate::observability::propagate_request_id,
        ))
        .with_state(state)
}

/// Runs the HTTP server until Ctrl-C.
///
/// Builds its own runtime, so it must be called from synchronous code.
///
/// # Errors
///
/// Returns an error if the runtime cannot start, the address is invalid, or the
/// listener cannot bind.
pub fn run(config: &FolioConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::InvalidInput(format!("server address: {e}")))?;

    let static_dir = config.static_dir.is_dir().then_some(config.static_dir.as_path());
    if static_dir.is_none() {
        tracing::warn!(
            dir = %config.static_dir.display(),
            "Static directory not found, serving API only"
        );
    }
    let app = router(state, static_dir);

    let rt = tokio::runtime::Runtime::new().map_err(|e| Error::OperationFailed {
        operation: "create_runtime".to_string(),
        cause: e.to_string(),
    })?;

    rt.block_on(async {
        let listener =
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "bind".to_string(),
                    cause: format!("{addr}: {e}"),
                })?;
        tracing::info!(%addr, "Folio listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "serve".to_string(),
                cause: e.to_string(),
            })
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

//! `livecode serve` -- HTTP surface over a single live session.
//!
//! One [`Orchestrator`](livecode_session::Orchestrator) per process, guarded
//! by a `tokio::sync::Mutex`. Generation requests run in the background and
//! feed their outcome back with the ticket issued at upload time.
//!
//! Endpoints:
//! - GET  /health      - Server status (exempt from auth)
//! - GET  /scope       - Identifiers and modules visible to component source
//! - GET  /session     - Session snapshot
//! - GET  /preview     - Standalone preview document with ETag
//! - POST /upload      - Start a generation from `{ "image": "<data URL>" }`
//! - POST /edit        - Replace the source with `{ "source": "..." }`
//! - POST /acknowledge - Clear a failed session
//! - POST /evaluate    - Stateless evaluation of `{ "source", "raw"? }`

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use livecode_eval::build_scope;
use livecode_session::HttpGenerator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use self::handlers::{
    handle_acknowledge, handle_edit, handle_evaluate, handle_health, handle_not_found,
    handle_preview, handle_scope, handle_session, handle_upload,
};
use self::middleware::auth_middleware;
use self::state::AppState;
use crate::config::Config;

/// Maximum request body size: 16 MB (images arrive as data URLs).
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Maximum component source size for `/edit` and `/evaluate`: 1 MB.
const MAX_SOURCE_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/scope", get(handle_scope))
        .route("/session", get(handle_session))
        .route("/preview", get(handle_preview))
        .route("/upload", post(handle_upload))
        .route("/edit", post(handle_edit))
        .route("/acknowledge", post(handle_acknowledge))
        .route("/evaluate", post(handle_evaluate))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl+C.
pub(crate) async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let generator = HttpGenerator::new(config.generator.url.clone(), config.generator.timeout());
    tracing::info!(endpoint = %generator.endpoint(), "generator configured");

    let api_key = config.serve.api_key.clone().filter(|k| !k.is_empty());
    if api_key.is_some() {
        eprintln!("API key authentication enabled");
    }

    let state = Arc::new(AppState::new(
        Arc::new(generator),
        build_scope(),
        config.sandbox,
        api_key,
        Duration::from_millis(config.serve.debounce_ms),
    ));

    let addr = format!("0.0.0.0:{}", config.serve.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("livecode session listening on http://{}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}

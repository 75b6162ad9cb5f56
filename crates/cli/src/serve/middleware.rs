//! HTTP middleware: API key authentication.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::state::AppState;

/// API key authentication middleware.
///
/// If an API key is configured (`LIVECODE_API_KEY` or `[serve] api_key`),
/// every request except `/health` must carry either
/// `Authorization: Bearer <key>` or `X-API-Key: <key>`.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let expected_key = match &state.api_key {
        Some(k) => k,
        None => return next.run(request).await,
    };

    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let headers = request.headers();
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let api_key_header = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let verdict = match bearer.or(api_key_header) {
        Some(presented) if presented == expected_key => Ok(()),
        Some(_) => Err((StatusCode::FORBIDDEN, "invalid API key")),
        None => Err((StatusCode::UNAUTHORIZED, "authentication required")),
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err((status, message)) => {
            tracing::warn!(path = %request.uri().path(), %status, "rejected unauthenticated request");
            super::json_error(status, message).into_response()
        }
    }
}

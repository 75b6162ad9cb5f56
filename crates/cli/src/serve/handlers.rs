//! Route handlers for the session surface.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use livecode_core::{normalize, HARNESS_VERSION};
use livecode_eval::evaluate_with;
use livecode_session::{EditOp, ImageInput, Orchestrator, SessionError, SessionSnapshot};
use sha2::{Digest, Sha256};

use super::state::AppState;
use super::{json_error, MAX_SOURCE_SIZE};

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "harness_version": HARNESS_VERSION,
    });
    (StatusCode::OK, Json(response))
}

/// GET /scope
pub(crate) async fn handle_scope(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "bindings": state.scope.summary(),
        "modules": state.scope.module_names().collect::<Vec<_>>(),
    });
    (StatusCode::OK, Json(response))
}

/// GET /session
pub(crate) async fn handle_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.session.lock().await.snapshot();
    (StatusCode::OK, Json(snapshot))
}

/// Run `op` against the session on the blocking pool; evaluation is CPU bound.
async fn with_session<T, F>(state: &AppState, op: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&mut Orchestrator) -> T + Send + 'static,
{
    let mut guard = state.session.clone().lock_owned().await;
    tokio::task::spawn_blocking(move || op(&mut guard))
        .await
        .map_err(|e| {
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("internal error: {}", e),
            )
            .into_response()
        })
}

fn session_response(outcome: Result<SessionSnapshot, SessionError>) -> Response {
    match outcome {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e @ SessionError::Edit(_)) => {
            json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response()
        }
        Err(e) => json_error(StatusCode::CONFLICT, &e.to_string()).into_response(),
    }
}

/// What `/edit` was asked to do: replace the text or apply one operation.
enum EditRequest {
    Source(String),
    Op(EditOp),
}

impl EditRequest {
    fn from_body(body: &serde_json::Value) -> Result<Self, Response> {
        if let Some(op) = body.get("op") {
            return serde_json::from_value(op.clone())
                .map(EditRequest::Op)
                .map_err(|e| {
                    json_error(StatusCode::BAD_REQUEST, &format!("invalid 'op': {}", e))
                        .into_response()
                });
        }
        required_str(body, "source").map(|s| EditRequest::Source(s.to_string()))
    }
}

fn required_str<'a>(body: &'a serde_json::Value, field: &str) -> Result<&'a str, Response> {
    body.get(field).and_then(|v| v.as_str()).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            &format!("missing '{}' field", field),
        )
        .into_response()
    })
}

fn check_source_size(source: &str) -> Result<(), Response> {
    if source.len() > MAX_SOURCE_SIZE {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            &format!(
                "source content exceeds maximum size of {} bytes",
                MAX_SOURCE_SIZE
            ),
        )
        .into_response());
    }
    Ok(())
}

/// POST /upload
///
/// Starts a generation and returns at once; poll `GET /session` for the
/// outcome. A newer upload supersedes this one.
pub(crate) async fn handle_upload(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let data_url = match required_str(&body, "image") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let image = match ImageInput::from_data_url(data_url) {
        Ok(i) => i,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
    };

    let ticket = state.session.lock().await.upload(&image);

    let background = state.clone();
    tokio::spawn(async move {
        let outcome = background.generator.generate(&image).await;
        let completion =
            with_session(&background, move |s| s.complete_generation(ticket, outcome)).await;
        if let Ok(completion) = completion {
            tracing::debug!(%ticket, ?completion, "generation settled");
        }
    });

    let response = serde_json::json!({
        "ticket": ticket,
        "state": "generating",
    });
    (StatusCode::ACCEPTED, Json(response)).into_response()
}

/// POST /edit
///
/// Body is `{ "source": "..." }` or `{ "op": { "op": "insert", ... } }`; an
/// op applies to the text the editor currently shows. With debouncing off the
/// edit is evaluated before responding. Otherwise it is staged and evaluated
/// once no newer edit arrives within the window.
pub(crate) async fn handle_edit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let source = match EditRequest::from_body(&body) {
        Ok(EditRequest::Source(source)) => source,
        Ok(EditRequest::Op(op)) => match state.session.lock().await.text_after(&op) {
            Ok(source) => source,
            Err(e) => return session_response(Err(e)),
        },
        Err(resp) => return resp,
    };
    if let Err(resp) = check_source_size(&source) {
        return resp;
    }

    if state.debounce.is_zero() {
        let outcome = with_session(&state, move |s| -> Result<SessionSnapshot, SessionError> {
            s.edit(source)?;
            Ok(s.snapshot())
        })
        .await;
        return match outcome {
            Ok(outcome) => session_response(outcome),
            Err(resp) => resp,
        };
    }

    let staged = {
        let mut session = state.session.lock().await;
        session.stage_edit(source).map(|()| session.snapshot())
    };
    if staged.is_ok() {
        let seq = state.next_edit();
        let background = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(background.debounce).await;
            if !background.is_latest_edit(seq) {
                return;
            }
            let _ = with_session(&background, |s| {
                if let Err(e) = s.flush() {
                    tracing::debug!(error = %e, "staged edit dropped");
                }
            })
            .await;
        });
    }
    match staged {
        Ok(snapshot) => (StatusCode::ACCEPTED, Json(snapshot)).into_response(),
        Err(e) => session_response(Err(e)),
    }
}

/// POST /acknowledge
pub(crate) async fn handle_acknowledge(State(state): State<Arc<AppState>>) -> Response {
    let mut session = state.session.lock().await;
    let outcome = session.acknowledge().map(|()| session.snapshot());
    session_response(outcome)
}

/// POST /evaluate
///
/// Stateless: evaluates `source` (normalizing it first when `raw` is true)
/// without touching the session.
pub(crate) async fn handle_evaluate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let source = match required_str(&body, "source") {
        Ok(s) => s.to_string(),
        Err(resp) => return resp,
    };
    if let Err(resp) = check_source_size(&source) {
        return resp;
    }
    let raw = body.get("raw").and_then(|v| v.as_bool()).unwrap_or(false);
    let scope = state.scope.clone();
    let limits = state.limits;

    let result = tokio::task::spawn_blocking(move || {
        let source = if raw {
            normalize(&source).into_string()
        } else {
            source
        };
        evaluate_with(&source, &scope, &limits)
    })
    .await;

    match result {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("internal error: {}", e),
        )
        .into_response(),
    }
}

/// SHA-256 of the document, hex encoded.
pub(crate) fn compute_etag(document: &str) -> String {
    format!("{:x}", Sha256::digest(document.as_bytes()))
}

/// GET /preview
///
/// The standalone preview document. Sets `ETag` and answers
/// `If-None-Match` with 304 Not Modified.
pub(crate) async fn handle_preview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let document = state.session.lock().await.preview().document();
    let etag = compute_etag(&document);
    let etag_quoted = format!("\"{}\"", etag);

    if let Some(inm) = headers.get(header::IF_NONE_MATCH) {
        if let Ok(inm_str) = inm.to_str() {
            if inm_str == etag_quoted || inm_str == etag {
                return StatusCode::NOT_MODIFIED.into_response();
            }
        }
    }

    let mut response = (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        document,
    )
        .into_response();
    if let Ok(val) = etag_quoted.parse() {
        response.headers_mut().insert(header::ETAG, val);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_is_hex_sha256() {
        let etag = compute_etag("<p>x</p>");
        assert_eq!(etag.len(), 64);
        assert!(etag.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(etag, compute_etag("<p>y</p>"));
    }
}

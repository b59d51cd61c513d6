//! Access logging.
//!
//! Every request runs inside an `http_request` span carrying method, path and
//! request id. JSON bodies whose size is known and within
//! `logging.max_body_bytes` are buffered, sanitized (masked, then truncated)
//! and logged; other bodies are logged by size only and streamed through.
//! A body that fails to buffer is never replaced: the request is rejected
//! with 400 before the handler runs, a broken response becomes a 500.

use std::time::Instant;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::Instrument;

use apistrap_core::error::ApiStrapError;
use apistrap_core::sanitize::sanitize_payload;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::middleware::request_id::RequestId;

pub async fn log_access(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_owned())
        .unwrap_or_default();
    let span = tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %request_id,
    );

    async move {
        let started = Instant::now();
        let req = match log_request(&state, req).await {
            Ok(req) => req,
            Err(rejection) => return rejection,
        };
        let response = next.run(req).await;
        log_response(&state, response, started).await
    }
    .instrument(span)
    .await
}

async fn log_request(state: &AppState, req: Request) -> Result<Request, Response> {
    let (parts, body) = req.into_parts();
    let limit = state.cfg().logging.max_body_bytes;

    if !is_json(&parts.headers) || !fits(&body, limit) {
        tracing::info!(size = ?body.size_hint().exact(), "request");
        return Ok(Request::from_parts(parts, body));
    }

    let bytes = match to_bytes(body, limit).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer request body");
            let err = ApiStrapError::BadRequest(format!("unreadable request body: {e}"));
            return Err(ApiError(err).into_response());
        }
    };
    match sanitized(state, &bytes) {
        Some(payload) => tracing::info!(size = bytes.len(), body = %payload, "request"),
        None => tracing::info!(size = bytes.len(), "request"),
    }
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

async fn log_response(state: &AppState, response: Response, started: Instant) -> Response {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let (parts, body) = response.into_parts();
    let status = parts.status.as_u16();
    let limit = state.cfg().logging.max_body_bytes;

    if !is_json(&parts.headers) || !fits(&body, limit) {
        tracing::info!(status, elapsed_ms, size = ?body.size_hint().exact(), "response");
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, limit).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(status, error = %e, "failed to buffer response body");
            let err = ApiStrapError::Internal(format!("unreadable response body: {e}"));
            return ApiError(err).into_response();
        }
    };
    match sanitized(state, &bytes) {
        Some(payload) => tracing::info!(status, elapsed_ms, size = bytes.len(), body = %payload, "response"),
        None => tracing::info!(status, elapsed_ms, size = bytes.len(), "response"),
    }
    Response::from_parts(parts, Body::from(bytes))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json") || ct.contains("+json"))
}

/// Only bodies with a known upper bound are buffered.
fn fits(body: &Body, limit: usize) -> bool {
    body.size_hint()
        .upper()
        .is_some_and(|n| n <= limit as u64)
}

fn sanitized(state: &AppState, bytes: &[u8]) -> Option<Value> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    Some(sanitize_payload(
        &value,
        state.sensitive_fields(),
        state.cfg().logging.truncation_threshold,
    ))
}

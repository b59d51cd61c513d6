//! Request-ID propagation.
//!
//! Reuses the caller's id header when present, otherwise generates a UUID v4.
//! The id is available to handlers and later middleware as a [`RequestId`]
//! extension and is echoed on the response.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::app_state::AppState;

/// Correlation id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn propagate_request_id(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let cfg = &state.cfg().request_id;
    let Ok(header) = HeaderName::from_bytes(cfg.header.as_bytes()) else {
        // Rejected by config validation; nothing to propagate.
        return next.run(req).await;
    };

    let id = req
        .headers()
        .get(&header)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(header, value);
    }
    response
}

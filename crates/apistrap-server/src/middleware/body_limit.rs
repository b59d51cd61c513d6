use axum::{
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

/// Rejects requests whose declared `Content-Length` exceeds
/// `security.max_request_bytes` with 413. Unparsable lengths pass through.
pub async fn limit_body_size(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let max = state.cfg().security.max_request_bytes;
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(len) = declared {
        if len > max {
            tracing::warn!(len, max, "request body too large");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Request body too large. Max size: {max} bytes"),
            )
                .into_response();
        }
    }
    next.run(req).await
}

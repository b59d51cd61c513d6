use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::app_state::AppState;

/// Adds the processing time as `<ms>ms` (two decimals).
pub async fn response_time(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(req).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(state.cfg().timing.header.as_bytes()),
        HeaderValue::from_str(&format!("{elapsed_ms:.2}ms")),
    ) {
        response.headers_mut().insert(name, value);
    }
    response
}

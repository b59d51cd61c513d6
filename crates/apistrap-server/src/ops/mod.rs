//! Operational HTTP endpoints.
//!
//! - health endpoint  : liveness, always `OK`
//! - ready endpoint   : readiness (503 when draining)
//! - metrics endpoint : Prometheus text exposition of the app's registry
//!
//! Paths come from config; `AppBuilder::build` mounts them outside the route
//! table so they are never grouped as application routes.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use apistrap_core::metrics::EXPOSITION_CONTENT_TYPE;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.metrics().export();
    (StatusCode::OK, [(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response()
}

/// Ops routes at their configured paths. The metrics endpoint is omitted
/// when `metrics.enabled` is false.
pub fn router(state: &AppState) -> Router<AppState> {
    let cfg = state.cfg();
    let mut r = Router::new()
        .route(&cfg.health.endpoint, get(healthz))
        .route(&cfg.health.ready_endpoint, get(readyz));
    if cfg.metrics.enabled {
        r = r.route(&cfg.metrics.endpoint, get(metrics));
    }
    r
}

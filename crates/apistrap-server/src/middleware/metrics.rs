//! Request metrics middleware.
//!
//! Per request: skip excluded paths, resolve the path template, then drive a
//! [`RequestTracker`] around the downstream call. A panic downstream is
//! recorded as `error_type="panic"` with status 500 and then resumed; the
//! middleware observes failures, it never absorbs them.

use std::panic::AssertUnwindSafe;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;

use apistrap_core::metrics::{RequestTracker, PANIC_ERROR_TYPE};

use crate::app_state::AppState;
use crate::error::FailureKind;

pub async fn track_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    if state.is_excluded(&path) {
        return next.run(req).await;
    }

    let method = req.method().clone();
    let template = state.routes().template_or_path(&method, &path).to_owned();
    let tracker = RequestTracker::start(state.metrics(), method.as_str(), template);

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => {
            let failure = response.extensions().get::<FailureKind>().map(FailureKind::name);
            tracker.finish(response.status().as_u16(), failure);
            response
        }
        Err(panic) => {
            tracing::error!(method = %tracker.method(), path = %tracker.path(), "handler panicked");
            tracker.finish(500, Some(PANIC_ERROR_TYPE));
            std::panic::resume_unwind(panic)
        }
    }
}

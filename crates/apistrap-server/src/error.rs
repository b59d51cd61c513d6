//! HTTP rendering of errors and failure tagging for metrics.
//!
//! A handler error that represents an unhandled failure (5xx) leaves a
//! [`FailureKind`] in the response extensions. The metrics middleware reads
//! it and counts the request under that name instead of the generic
//! `http_5xx` label.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use apistrap_core::error::ApiStrapError;

/// Type name of the failure that produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureKind(pub &'static str);

impl FailureKind {
    /// Short type name of `T` (`my_app::errors::ValueError` -> `ValueError`).
    pub fn of<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        // Strip generic arguments before taking the last path segment.
        let base = full.split('<').next().unwrap_or(full);
        Self(base.rsplit("::").next().unwrap_or(base))
    }

    pub fn name(&self) -> &'static str {
        self.0
    }

    /// Attach to a response.
    pub fn tag(self, mut response: Response) -> Response {
        response.extensions_mut().insert(self);
        response
    }
}

/// Handler-facing error wrapper around [`ApiStrapError`].
#[derive(Debug)]
pub struct ApiError(pub ApiStrapError);

impl From<ApiStrapError> for ApiError {
    fn from(e: ApiStrapError) -> Self {
        Self(e)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let msg = if status.is_server_error() {
            // Detail stays in the log, never in the response body.
            tracing::error!(error = %self.0, "request failed");
            "internal server error".to_owned()
        } else {
            tracing::debug!(error = %self.0, "request rejected");
            self.0.to_string()
        };

        let response = (status, Json(json!({ "code": code.as_str(), "msg": msg }))).into_response();
        if status.is_server_error() {
            FailureKind(self.0.kind_name()).tag(response)
        } else {
            response
        }
    }
}

/// Handler result type.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

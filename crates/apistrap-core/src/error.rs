//! Shared error type across apistrap crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Missing or rejected credentials.
    Unauthorized,
    /// Resource does not exist.
    NotFound,
    /// Payload too large.
    PayloadTooLarge,
    /// Internal server error (also used for startup/config failures).
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Unauthorized => "UNAUTHORIZED",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status code the code maps to.
    pub fn http_status(self) -> u16 {
        match self {
            ClientCode::BadRequest => 400,
            ClientCode::Unauthorized => 401,
            ClientCode::NotFound => 404,
            ClientCode::PayloadTooLarge => 413,
            ClientCode::Internal => 500,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ApiStrapError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum ApiStrapError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("invalid metric: {0}")]
    InvalidMetric(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiStrapError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            ApiStrapError::Config(_)
            | ApiStrapError::UnsupportedVersion
            | ApiStrapError::InvalidMetric(_)
            | ApiStrapError::Internal(_) => ClientCode::Internal,
            ApiStrapError::BadRequest(_) => ClientCode::BadRequest,
            ApiStrapError::Unauthorized => ClientCode::Unauthorized,
            ApiStrapError::NotFound(_) => ClientCode::NotFound,
            ApiStrapError::PayloadTooLarge => ClientCode::PayloadTooLarge,
        }
    }

    /// HTTP status for this error.
    pub fn http_status(&self) -> u16 {
        self.client_code().http_status()
    }

    /// Variant name, used as the `error_type` label for server-side failures.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ApiStrapError::Config(_) => "Config",
            ApiStrapError::UnsupportedVersion => "UnsupportedVersion",
            ApiStrapError::InvalidMetric(_) => "InvalidMetric",
            ApiStrapError::BadRequest(_) => "BadRequest",
            ApiStrapError::Unauthorized => "Unauthorized",
            ApiStrapError::NotFound(_) => "NotFound",
            ApiStrapError::PayloadTooLarge => "PayloadTooLarge",
            ApiStrapError::Internal(_) => "Internal",
        }
    }
}

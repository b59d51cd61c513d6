//! Payload sanitizers applied before request/response bodies are logged.
//!
//! Both passes are pure: they borrow the input and build fresh containers at
//! every level.

pub mod mask;
pub mod truncate;

use serde_json::Value;

pub use mask::{mask_sensitive, SensitiveFields, DEFAULT_SENSITIVE_FIELDS, MASKED_MARKER};
pub use truncate::{truncate_strings, DEFAULT_TRUNCATION_THRESHOLD, TRUNCATED_MARKER};

/// Mask sensitive fields, then truncate long strings.
pub fn sanitize_payload(value: &Value, fields: &SensitiveFields, threshold: usize) -> Value {
    truncate_strings(&mask_sensitive(value, fields), threshold)
}

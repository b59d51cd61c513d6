//! HTTP middleware stack.
//!
//! All layers are plain `async fn`s mounted with
//! `axum::middleware::from_fn_with_state`; see `router::AppBuilder::build`
//! for the order.

pub mod access_log;
pub mod body_limit;
pub mod metrics;
pub mod request_id;
pub mod security_headers;
pub mod timing;

pub use access_log::log_access;
pub use body_limit::limit_body_size;
pub use metrics::track_metrics;
pub use request_id::{propagate_request_id, RequestId};
pub use security_headers::security_headers;
pub use timing::response_time;

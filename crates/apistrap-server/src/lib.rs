//! apistrap server library.
//!
//! Wires config, logging, the HTTP middleware stack (request id, access log,
//! metrics, timing, security headers, body limit) and ops endpoints around an
//! axum router. Consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod middleware;
pub mod ops;
pub mod router;
pub mod routes;

pub use app_state::AppState;
pub use error::{ApiError, ApiResult, FailureKind};
pub use lifecycle::LifecycleHook;
pub use router::{App, AppBuilder};

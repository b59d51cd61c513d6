//! apistrap: request metrics, structured access logging and security
//! middleware for axum services, behind one dependency.
//!
//! `core` holds the framework-agnostic registry and sanitizers, `server` the
//! axum integration. Most applications only need the [`prelude`].

pub mod core {
    pub use apistrap_core::*;
}

pub mod server {
    pub use apistrap_server::*;
}

pub mod prelude {
    pub use apistrap_core::metrics::{registry, MetricsRegistry, RequestTracker};
    pub use apistrap_core::{ApiStrapError, Result};
    pub use apistrap_server::config::{self, ServerConfig, Stage};
    pub use apistrap_server::logging::init_logging;
    pub use apistrap_server::{
        ApiError, ApiResult, App, AppBuilder, AppState, FailureKind, LifecycleHook,
    };
}

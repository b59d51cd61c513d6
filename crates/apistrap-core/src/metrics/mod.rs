//! In-process Prometheus metrics.
//!
//! Primitives are plain lock-guarded accumulators; the registry keys them by
//! label tuple and renders the text exposition format; the tracker drives
//! the per-request state machine used by the HTTP middleware.

pub mod primitives;
pub mod registry;
pub mod tracker;

pub use primitives::{Counter, Gauge, Histogram, HistogramSnapshot, DEFAULT_BUCKETS};
pub use registry::{
    registry, registry_with_buckets, reset_registries, MetricsRegistry, DEFAULT_APP_NAME,
};
pub use tracker::{RequestTracker, HTTP_5XX, PANIC_ERROR_TYPE};

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

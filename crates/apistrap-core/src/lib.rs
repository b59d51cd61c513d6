//! apistrap core: framework-agnostic metrics primitives, the Prometheus
//! registry, and payload sanitizers for structured request logging.
//!
//! This crate carries no HTTP or runtime dependencies so the registry can be
//! driven directly by application code as well as by the server middleware.
//!
//! # Guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `ApiStrapError`/`Result` so a bad
//! bucket layout or config value never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;
pub mod sanitize;

/// Shared result type.
pub use error::{ApiStrapError, Result};

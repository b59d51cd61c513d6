//! Per-request bookkeeping shared by every HTTP integration.
//!
//! A tracker is started when a request enters the instrumented pipeline and
//! finished exactly once with the final status. Finishing records, in order:
//! latency, request count, error count (when applicable), then releases the
//! in-progress gauge.

use std::sync::Arc;
use std::time::Instant;

use crate::metrics::primitives::Gauge;
use crate::metrics::registry::MetricsRegistry;

/// Error label used when a 5xx response carries no failure type.
pub const HTTP_5XX: &str = "http_5xx";

/// Error label recorded when the downstream handler panicked.
pub const PANIC_ERROR_TYPE: &str = "panic";

pub struct RequestTracker {
    registry: Arc<MetricsRegistry>,
    method: String,
    path: String,
    in_progress: Arc<Gauge>,
    started: Instant,
    finished: bool,
}

impl RequestTracker {
    /// Increment the in-progress gauge and start the clock.
    pub fn start(registry: Arc<MetricsRegistry>, method: impl Into<String>, path: impl Into<String>) -> Self {
        let method = method.into();
        let path = path.into();
        let in_progress = registry.requests_in_progress(&method, &path);
        in_progress.increment(1.0);
        Self {
            registry,
            method,
            path,
            in_progress,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Record the outcome of the request.
    ///
    /// `error_type` names the failure (type name of the error, or
    /// [`PANIC_ERROR_TYPE`]); a status `>= 500` without one is counted as
    /// [`HTTP_5XX`].
    pub fn finish(mut self, status: u16, error_type: Option<&str>) {
        let elapsed = self.started.elapsed();
        self.registry
            .request_latency(&self.method, &self.path)
            .observe_duration(elapsed);
        self.registry
            .request_count(&self.method, &self.path, status)
            .increment();
        if error_type.is_some() || status >= 500 {
            let label = error_type.unwrap_or(HTTP_5XX);
            self.registry
                .error_count(&self.method, &self.path, label)
                .increment();
        }
        self.in_progress.decrement(1.0);
        self.finished = true;
    }
}

impl Drop for RequestTracker {
    fn drop(&mut self) {
        // Request future dropped mid-flight (client went away): release the
        // gauge only, there is no status to record.
        if !self.finished {
            self.in_progress.decrement(1.0);
            tracing::debug!(method = %self.method, path = %self.path, "request cancelled before completion");
        }
    }
}

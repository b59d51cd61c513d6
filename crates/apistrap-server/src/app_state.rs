//! Shared application state for apistrap servers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use apistrap_core::error::Result;
use apistrap_core::metrics::{registry_with_buckets, MetricsRegistry, DEFAULT_BUCKETS};
use apistrap_core::sanitize::SensitiveFields;

use crate::config::ServerConfig;
use crate::routes::RouteTable;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    metrics: Arc<MetricsRegistry>,
    routes: Arc<RouteTable>,
    sensitive: SensitiveFields,
    exclusions: Vec<String>,
    draining: AtomicBool,
}

impl AppState {
    /// Build state for a validated config. The registry comes from the
    /// process-wide table keyed by `app.name`.
    pub fn new(cfg: ServerConfig, routes: RouteTable) -> Result<Self> {
        let buckets = cfg
            .metrics
            .latency_buckets
            .clone()
            .unwrap_or_else(|| DEFAULT_BUCKETS.to_vec());
        let metrics = registry_with_buckets(&cfg.app.name, &buckets)?;
        Ok(Self::with_registry(cfg, routes, metrics))
    }

    /// Build state around an explicit registry (tests, embedded use).
    pub fn with_registry(cfg: ServerConfig, routes: RouteTable, metrics: Arc<MetricsRegistry>) -> Self {
        let sensitive = SensitiveFields::new(&cfg.logging.mask_fields);
        let exclusions = cfg.metrics_exclusions();
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics,
                routes: Arc::new(routes),
                sensitive,
                exclusions,
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn sensitive_fields(&self) -> &SensitiveFields {
        &self.inner.sensitive
    }

    /// Whether the literal request path skips metrics instrumentation.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.inner.exclusions.iter().any(|p| p == path)
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}

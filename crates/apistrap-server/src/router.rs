//! Application assembly.
//!
//! [`AppBuilder`] collects routes into both the axum router and the
//! [`RouteTable`] used for metrics grouping, then mounts ops endpoints and the
//! middleware stack. Layers, outermost first: request id, access log,
//! metrics, timing, security headers, body limit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    handler::Handler,
    http::Method,
    middleware::from_fn_with_state,
    routing::{on, MethodFilter},
    Router,
};
use tokio::net::TcpListener;

use apistrap_core::error::{ApiStrapError, Result};
use apistrap_core::metrics::MetricsRegistry;

use crate::app_state::AppState;
use crate::config::ServerConfig;
use crate::lifecycle::{self, LifecycleHook};
use crate::middleware;
use crate::ops;
use crate::routes::RouteTable;

pub struct AppBuilder {
    cfg: ServerConfig,
    router: Router<AppState>,
    routes: RouteTable,
    registry: Option<Arc<MetricsRegistry>>,
    startup: Vec<Arc<dyn LifecycleHook>>,
    shutdown: Vec<Arc<dyn LifecycleHook>>,
    errors: Vec<String>,
}

impl AppBuilder {
    pub fn new(cfg: ServerConfig) -> Self {
        Self {
            cfg,
            router: Router::new(),
            routes: RouteTable::new(),
            registry: None,
            startup: Vec::new(),
            shutdown: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Register `handler` for `method` at `app.prefix + path`. The route is
    /// also recorded as a metrics template. Unknown methods, relative paths,
    /// duplicates and collisions with ops endpoints surface from
    /// [`AppBuilder::build`].
    pub fn route<H, T>(mut self, method: &str, path: &str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        let full = self.prefixed(path);
        if !path.starts_with('/') {
            self.errors.push(format!("route path must start with '/': {path:?}"));
            return self;
        }
        let parsed = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .ok()
            .and_then(|m| MethodFilter::try_from(m.clone()).ok().map(|f| (m, f)));

        match parsed {
            Some((m, filter)) => {
                if self.cfg.ops_paths().contains(&full.as_str()) {
                    self.errors.push(format!("route {full} collides with an ops endpoint"));
                    return self;
                }
                if self
                    .routes
                    .iter()
                    .any(|r| r.template() == full && r.method() == Some(&m))
                {
                    self.errors.push(format!("route {m} {full} is registered twice"));
                    return self;
                }
                self.router = self.router.route(&full, on(filter, handler));
                self.routes.insert(Some(m), &full);
            }
            None => self.errors.push(format!("unsupported method {method:?} for route {full}")),
        }
        self
    }

    /// Merge routes that are served but not grouped by template; their
    /// metrics fall back to the literal request path.
    pub fn merge_untracked(mut self, router: Router<AppState>) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Use `registry` instead of the process-wide one for `app.name`.
    pub fn with_registry(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn on_startup(mut self, hook: impl LifecycleHook + 'static) -> Self {
        self.startup.push(Arc::new(hook));
        self
    }

    pub fn on_shutdown(mut self, hook: impl LifecycleHook + 'static) -> Self {
        self.shutdown.push(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<App> {
        if let Some(e) = self.errors.into_iter().next() {
            return Err(ApiStrapError::Config(e));
        }
        self.cfg.validate()?;

        let state = match self.registry {
            Some(registry) => AppState::with_registry(self.cfg, self.routes, registry),
            None => AppState::new(self.cfg, self.routes)?,
        };
        state.metrics().set_app_info([
            ("version", state.cfg().app.version.clone()),
            ("apistrap_version", env!("CARGO_PKG_VERSION").to_owned()),
        ]);

        let cfg = state.cfg();
        let mut router = self.router.merge(ops::router(&state));

        // Innermost first.
        router = router.layer(from_fn_with_state(state.clone(), middleware::limit_body_size));
        if cfg.security.headers_enabled {
            router = router.layer(from_fn_with_state(state.clone(), middleware::security_headers));
        }
        if cfg.timing.enabled {
            router = router.layer(from_fn_with_state(state.clone(), middleware::response_time));
        }
        if cfg.metrics.enabled {
            router = router.layer(from_fn_with_state(state.clone(), middleware::track_metrics));
        }
        router = router.layer(from_fn_with_state(state.clone(), middleware::log_access));
        if cfg.request_id.enabled {
            router = router.layer(from_fn_with_state(state.clone(), middleware::propagate_request_id));
        }

        tracing::debug!(routes = state.routes().len(), app = %cfg.app.name, "app built");
        Ok(App {
            router: router.with_state(state.clone()),
            state,
            startup: self.startup,
            shutdown: self.shutdown,
        })
    }

    fn prefixed(&self, path: &str) -> String {
        let prefix = &self.cfg.app.prefix;
        if prefix.is_empty() {
            path.to_owned()
        } else if path == "/" {
            prefix.clone()
        } else {
            format!("{prefix}{path}")
        }
    }
}

pub struct App {
    router: Router,
    state: AppState,
    startup: Vec<Arc<dyn LifecycleHook>>,
    shutdown: Vec<Arc<dyn LifecycleHook>>,
}

impl App {
    /// The fully layered router (for in-process tests).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until Ctrl-C/SIGTERM.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, lifecycle::shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then drain for `shutdown.drain_secs`,
    /// stop accepting, wait for in-flight requests and run shutdown hooks.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        lifecycle::run_startup(&self.startup, &self.state).await?;

        let drain = Duration::from_secs(self.state.cfg().shutdown.drain_secs);
        let local = listener
            .local_addr()
            .map_err(|e| ApiStrapError::Internal(format!("listener address: {e}")))?;
        tracing::info!(%local, app = %self.state.cfg().app.name, "apistrap server starting");

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(lifecycle::drain(self.state.clone(), signal, drain))
            .await;

        lifecycle::run_shutdown(&self.shutdown, &self.state).await;
        tracing::info!("apistrap server stopped");
        served.map_err(|e| ApiStrapError::Internal(format!("server failed: {e}")))
    }
}

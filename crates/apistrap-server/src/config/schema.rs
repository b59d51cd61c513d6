use serde::Deserialize;

use apistrap_core::error::{ApiStrapError, Result};
use apistrap_core::metrics::primitives::validate_buckets;
use apistrap_core::metrics::DEFAULT_APP_NAME;
use apistrap_core::sanitize::{DEFAULT_SENSITIVE_FIELDS, DEFAULT_TRUNCATION_THRESHOLD};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub app: AppSection,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub request_id: RequestIdConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppSection::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            health: HealthConfig::default(),
            security: SecurityConfig::default(),
            request_id: RequestIdConfig::default(),
            timing: TimingConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ApiStrapError::UnsupportedVersion);
        }
        self.app.validate()?;
        self.logging.validate()?;
        self.metrics.validate()?;
        self.health.validate()?;
        self.security.validate()?;
        self.request_id.validate()?;
        self.timing.validate()?;
        self.shutdown.validate()?;

        let ops = self.ops_paths();
        for (i, path) in ops.iter().enumerate() {
            if ops[..i].contains(path) {
                return Err(ApiStrapError::Config(format!(
                    "health, readiness and metrics endpoints must differ; {path:?} is used twice"
                )));
            }
        }
        Ok(())
    }

    /// Paths served by the ops router.
    pub fn ops_paths(&self) -> Vec<&str> {
        let mut paths = vec![self.health.endpoint.as_str(), self.health.ready_endpoint.as_str()];
        if self.metrics.enabled {
            paths.push(self.metrics.endpoint.as_str());
        }
        paths
    }

    /// Paths the metrics middleware never instruments.
    pub fn metrics_exclusions(&self) -> Vec<String> {
        match &self.metrics.exclude_paths {
            Some(paths) => paths.clone(),
            None => vec![
                self.health.endpoint.clone(),
                self.health.ready_endpoint.clone(),
                self.metrics.endpoint.clone(),
                "/docs".into(),
                "/redoc".into(),
            ],
        }
    }
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Dev,
    Staging,
    Prod,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Dev => "dev",
            Stage::Staging => "staging",
            Stage::Prod => "prod",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Some(Stage::Dev),
            "staging" => Some(Stage::Staging),
            "prod" => Some(Stage::Prod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    /// Metric prefix and registry name.
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_app_version")]
    pub version: String,

    #[serde(default = "default_listen")]
    pub listen: String,

    /// Prefix prepended to every application route.
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_stage")]
    pub stage: Stage,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            title: default_title(),
            version: default_app_version(),
            listen: default_listen(),
            prefix: String::new(),
            stage: default_stage(),
        }
    }
}

impl AppSection {
    pub fn validate(&self) -> Result<()> {
        if !is_metric_name(&self.name) {
            return Err(ApiStrapError::Config(format!(
                "app.name must match [a-zA-Z_][a-zA-Z0-9_]*, got {:?}",
                self.name
            )));
        }
        if !self.prefix.is_empty() && (!self.prefix.starts_with('/') || self.prefix.ends_with('/')) {
            return Err(ApiStrapError::Config(
                "app.prefix must start with '/' and must not end with '/'".into(),
            ));
        }
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ApiStrapError::Config(format!(
                "app.listen must be a valid socket address, got {:?}",
                self.listen
            )));
        }
        Ok(())
    }
}

fn is_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.into()
}
fn default_title() -> String {
    "apistrap application".into()
}
fn default_app_version() -> String {
    "0.1.0".into()
}
fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_stage() -> Stage {
    Stage::Dev
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    /// JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,

    #[serde(default = "default_truncation_threshold")]
    pub truncation_threshold: usize,

    /// Largest body buffered for access logging.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_mask_fields")]
    pub mask_fields: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            truncation_threshold: default_truncation_threshold(),
            max_body_bytes: default_max_body_bytes(),
            mask_fields: default_mask_fields(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        normalize_level(&self.level)?;
        if !(100..=50_000).contains(&self.truncation_threshold) {
            return Err(ApiStrapError::Config(
                "logging.truncation_threshold must be between 100 and 50000".into(),
            ));
        }
        Ok(())
    }

    /// Level as understood by `EnvFilter`.
    pub fn filter_level(&self) -> Result<&'static str> {
        normalize_level(&self.level)
    }
}

/// Accepts tracing levels plus the `WARNING`/`CRITICAL` spellings.
pub fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" | "critical" => Ok("error"),
        _ => Err(ApiStrapError::Config(format!(
            "logging.level must be one of trace, debug, info, warn, error; got {level:?}"
        ))),
    }
}

fn default_level() -> String {
    "info".into()
}
fn default_truncation_threshold() -> usize {
    DEFAULT_TRUNCATION_THRESHOLD
}
fn default_max_body_bytes() -> usize {
    64 * 1024
}
fn default_mask_fields() -> Vec<String> {
    DEFAULT_SENSITIVE_FIELDS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_metrics_endpoint")]
    pub endpoint: String,

    /// Literal paths never instrumented. `None` means health, readiness,
    /// metrics and docs endpoints.
    #[serde(default)]
    pub exclude_paths: Option<Vec<String>>,

    #[serde(default)]
    pub latency_buckets: Option<Vec<f64>>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_metrics_endpoint(),
            exclude_paths: None,
            latency_buckets: None,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        validate_path("metrics.endpoint", &self.endpoint)?;
        if let Some(buckets) = &self.latency_buckets {
            validate_buckets(buckets)
                .map_err(|e| ApiStrapError::Config(format!("metrics.latency_buckets: {e}")))?;
        }
        Ok(())
    }
}

fn default_metrics_endpoint() -> String {
    "/metrics".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(default = "default_health_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_ready_endpoint")]
    pub ready_endpoint: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            endpoint: default_health_endpoint(),
            ready_endpoint: default_ready_endpoint(),
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<()> {
        validate_path("health.endpoint", &self.endpoint)?;
        validate_path("health.ready_endpoint", &self.ready_endpoint)
    }
}

fn default_health_endpoint() -> String {
    "/healthz".into()
}
fn default_ready_endpoint() -> String {
    "/readyz".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    #[serde(default = "default_true")]
    pub headers_enabled: bool,

    /// Security headers are skipped in the `dev` stage unless set.
    #[serde(default)]
    pub enable_in_dev: bool,

    #[serde(default = "default_hsts_max_age")]
    pub hsts_max_age: u64,

    #[serde(default = "default_true")]
    pub hsts_include_subdomains: bool,

    #[serde(default)]
    pub hsts_preload: bool,

    #[serde(default = "default_csp")]
    pub content_security_policy: String,

    #[serde(default = "default_x_frame_options")]
    pub x_frame_options: String,

    #[serde(default = "default_x_content_type_options")]
    pub x_content_type_options: String,

    #[serde(default = "default_referrer_policy")]
    pub referrer_policy: String,

    #[serde(default = "default_permissions_policy")]
    pub permissions_policy: String,

    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            headers_enabled: true,
            enable_in_dev: false,
            hsts_max_age: default_hsts_max_age(),
            hsts_include_subdomains: true,
            hsts_preload: false,
            content_security_policy: default_csp(),
            x_frame_options: default_x_frame_options(),
            x_content_type_options: default_x_content_type_options(),
            referrer_policy: default_referrer_policy(),
            permissions_policy: default_permissions_policy(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_request_bytes < 1024 {
            return Err(ApiStrapError::Config(
                "security.max_request_bytes must be at least 1024".into(),
            ));
        }
        Ok(())
    }
}

fn default_hsts_max_age() -> u64 {
    31_536_000
}
fn default_csp() -> String {
    "default-src 'self'".into()
}
fn default_x_frame_options() -> String {
    "DENY".into()
}
fn default_x_content_type_options() -> String {
    "nosniff".into()
}
fn default_referrer_policy() -> String {
    "strict-origin-when-cross-origin".into()
}
fn default_permissions_policy() -> String {
    "geolocation=(), microphone=(), camera=()".into()
}
fn default_max_request_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestIdConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_request_id_header")]
    pub header: String,
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self { enabled: true, header: default_request_id_header() }
    }
}

impl RequestIdConfig {
    pub fn validate(&self) -> Result<()> {
        validate_header_name("request_id.header", &self.header)
    }
}

fn default_request_id_header() -> String {
    "x-request-id".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_timing_header")]
    pub header: String,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { enabled: true, header: default_timing_header() }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<()> {
        validate_header_name("timing.header", &self.header)
    }
}

fn default_timing_header() -> String {
    "x-response-time".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShutdownConfig {
    /// Seconds between the shutdown signal and closing the listener, while
    /// readiness reports `draining`.
    #[serde(default = "default_drain_secs")]
    pub drain_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { drain_secs: default_drain_secs() }
    }
}

impl ShutdownConfig {
    pub fn validate(&self) -> Result<()> {
        if self.drain_secs > 300 {
            return Err(ApiStrapError::Config(
                "shutdown.drain_secs must be between 0 and 300".into(),
            ));
        }
        Ok(())
    }
}

fn default_drain_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn validate_path(field: &str, path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(ApiStrapError::Config(format!("{field} must start with '/'")));
    }
    Ok(())
}

fn validate_header_name(field: &str, name: &str) -> Result<()> {
    axum::http::HeaderName::from_bytes(name.as_bytes())
        .map(|_| ())
        .map_err(|_| ApiStrapError::Config(format!("{field} is not a valid header name: {name:?}")))
}

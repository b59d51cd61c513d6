//! Server config loader (strict parsing) and environment overrides.

pub mod schema;

use std::fs;
use std::path::Path;

use apistrap_core::error::{ApiStrapError, Result};

pub use schema::{
    normalize_level, AppSection, HealthConfig, LoggingConfig, MetricsConfig, RequestIdConfig,
    SecurityConfig, ServerConfig, ShutdownConfig, Stage, TimingConfig,
};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ServerConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| ApiStrapError::Config(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| ApiStrapError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Apply environment overrides on top of a parsed config, then re-validate.
///
/// `lookup` is `|k| std::env::var(k).ok()` in production; tests pass a map.
pub fn apply_env_overrides<F>(cfg: &mut ServerConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("STAGE") {
        // Unknown stages keep the configured one.
        match Stage::parse(&v) {
            Some(stage) => cfg.app.stage = stage,
            None => tracing::warn!(value = %v, "ignoring unknown STAGE"),
        }
    }
    if let Some(v) = lookup("APP_NAME") {
        cfg.app.name = v;
    }
    if let Some(v) = lookup("APP_TITLE") {
        cfg.app.title = v;
    }
    if let Some(v) = lookup("APP_VERSION") {
        cfg.app.version = v;
    }
    if let Some(v) = lookup("APP_LISTEN") {
        cfg.app.listen = v;
    }
    if let Some(v) = lookup("LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = lookup("LOG_JSON") {
        cfg.logging.json = parse_bool(&v);
    }
    if let Some(v) = lookup("LOG_TRUNCATION_THRESHOLD") {
        cfg.logging.truncation_threshold = parse_int("LOG_TRUNCATION_THRESHOLD", &v)?;
    }
    if let Some(v) = lookup("METRICS_ENABLED") {
        cfg.metrics.enabled = parse_bool(&v);
    }
    if let Some(v) = lookup("METRICS_ENDPOINT") {
        cfg.metrics.endpoint = v;
    }
    if let Some(v) = lookup("GRACEFUL_SHUTDOWN_TIMEOUT") {
        cfg.shutdown.drain_secs = parse_int("GRACEFUL_SHUTDOWN_TIMEOUT", &v)?;
    }
    cfg.validate()
}

/// Load `path` when it exists (defaults otherwise) and apply process env.
pub fn load(path: impl AsRef<Path>) -> Result<ServerConfig> {
    let path = path.as_ref();
    let mut cfg = if path.exists() {
        load_from_file(path)?
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        ServerConfig::default()
    };
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    Ok(cfg)
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_int<T: std::str::FromStr>(name: &str, v: &str) -> Result<T> {
    v.trim().parse().map_err(|_| {
        ApiStrapError::Config(format!("environment variable {name} must be an integer, got: {v:?}"))
    })
}

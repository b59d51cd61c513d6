#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use apistrap_core::error::ApiStrapError;
use apistrap_core::metrics::MetricsRegistry;
use apistrap_server::config::ServerConfig;
use apistrap_server::AppBuilder;

fn reg(name: &str) -> Arc<MetricsRegistry> {
    Arc::new(MetricsRegistry::new(name))
}

#[test]
fn routes_land_in_route_table_with_prefix() {
    let mut cfg = ServerConfig::default();
    cfg.app.prefix = "/v1".into();
    let app = AppBuilder::new(cfg)
        .route("get", "/items/:id", || async { "item" })
        .route("POST", "/items", || async { "created" })
        .route("GET", "/", || async { "root" })
        .with_registry(reg("builder_prefix"))
        .build()
        .unwrap();

    let templates: Vec<&str> = app.state().routes().iter().map(|r| r.template()).collect();
    assert_eq!(templates, vec!["/v1/items/:id", "/v1/items", "/v1"]);
}

#[test]
fn unknown_method_fails_build() {
    let err = AppBuilder::new(ServerConfig::default())
        .route("FETCH", "/x", || async { "x" })
        .with_registry(reg("builder_method"))
        .build()
        .err()
        .unwrap();
    match err {
        ApiStrapError::Config(msg) => assert!(msg.contains("FETCH")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn relative_path_fails_build() {
    let err = AppBuilder::new(ServerConfig::default())
        .route("GET", "items", || async { "x" })
        .with_registry(reg("builder_relative"))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ApiStrapError::Config(_)));
}

#[test]
fn invalid_config_fails_build() {
    let mut cfg = ServerConfig::default();
    cfg.logging.truncation_threshold = 1;
    let err = AppBuilder::new(cfg).with_registry(reg("builder_cfg")).build().err().unwrap();
    assert!(matches!(err, ApiStrapError::Config(_)));
}

#[test]
fn configured_buckets_reach_process_wide_registry() {
    let mut cfg = ServerConfig::default();
    cfg.app.name = "builder_buckets".into();
    cfg.metrics.latency_buckets = Some(vec![0.5, 5.0]);
    let app = AppBuilder::new(cfg).build().unwrap();
    assert_eq!(app.state().metrics().latency_buckets(), &[0.5, 5.0]);
}

#[test]
fn route_on_ops_endpoint_fails_build() {
    let err = AppBuilder::new(ServerConfig::default())
        .route("GET", "/healthz", || async { "mine" })
        .with_registry(reg("builder_ops_clash"))
        .build()
        .err()
        .unwrap();
    match err {
        ApiStrapError::Config(msg) => assert!(msg.contains("/healthz")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn prefixed_route_may_reuse_ops_path_name() {
    let mut cfg = ServerConfig::default();
    cfg.app.prefix = "/api".into();
    let app = AppBuilder::new(cfg)
        .route("GET", "/metrics", || async { "business metrics" })
        .with_registry(reg("builder_ops_prefixed"))
        .build();
    assert!(app.is_ok());
}

#[test]
fn metrics_path_is_free_when_metrics_disabled() {
    let mut cfg = ServerConfig::default();
    cfg.metrics.enabled = false;
    let app = AppBuilder::new(cfg)
        .route("GET", "/metrics", || async { "mine" })
        .with_registry(reg("builder_metrics_off"))
        .build();
    assert!(app.is_ok());
}

#[test]
fn duplicate_route_fails_build() {
    let err = AppBuilder::new(ServerConfig::default())
        .route("GET", "/items", || async { "a" })
        .route("get", "/items", || async { "b" })
        .with_registry(reg("builder_dup"))
        .build()
        .err()
        .unwrap();
    match err {
        ApiStrapError::Config(msg) => assert!(msg.contains("GET /items")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn different_methods_share_a_path() {
    let app = AppBuilder::new(ServerConfig::default())
        .route("GET", "/items", || async { "list" })
        .route("POST", "/items", || async { "create" })
        .with_registry(reg("builder_methods"))
        .build()
        .unwrap();
    assert_eq!(app.state().routes().len(), 2);
}

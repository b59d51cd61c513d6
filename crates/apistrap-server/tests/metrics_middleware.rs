//! Request metrics through the full middleware stack.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Path,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceExt;

use apistrap_core::error::ApiStrapError;
use apistrap_core::metrics::MetricsRegistry;
use apistrap_server::config::ServerConfig;
use apistrap_server::{ApiResult, AppBuilder, FailureKind};

struct ValueError;

async fn get_user(Path(id): Path<u32>) -> String {
    format!("user {id}")
}

async fn value_error() -> Response {
    FailureKind::of::<ValueError>().tag((StatusCode::INTERNAL_SERVER_ERROR, "bad value").into_response())
}

async fn internal() -> ApiResult<String> {
    Err(ApiStrapError::Internal("db down".into()).into())
}

async fn missing() -> ApiResult<String> {
    Err(ApiStrapError::NotFound("widget".into()).into())
}

async fn plain_503() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn panics() -> &'static str {
    panic!("handler blew up")
}

fn build(cfg: ServerConfig, name: &str) -> (Router, Arc<MetricsRegistry>) {
    let reg = Arc::new(MetricsRegistry::new(name));
    let app = AppBuilder::new(cfg)
        .route("GET", "/users/:id", get_user)
        .route("GET", "/value-error", value_error)
        .route("GET", "/internal", internal)
        .route("GET", "/missing", missing)
        .route("GET", "/unavailable", plain_503)
        .route("GET", "/panic", panics)
        .merge_untracked(Router::new().route("/raw/:x", get(|| async { "raw" })))
        .with_registry(Arc::clone(&reg))
        .build()
        .unwrap();
    (app.router(), reg)
}

async fn call(router: &Router, uri: &str) -> Response {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn has_line(export: &str, line: &str) -> bool {
    export.lines().any(|l| l == line)
}

#[tokio::test]
async fn requests_are_grouped_by_route_template() {
    let (router, reg) = build(ServerConfig::default(), "tmpl");
    for id in [1, 2, 3] {
        let res = call(&router, &format!("/users/{id}")).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let out = reg.export();
    assert!(has_line(
        &out,
        r#"tmpl_http_requests_total{method="GET",path="/users/:id",status="200"} 3"#
    ));
    assert!(has_line(&out, r#"tmpl_http_request_duration_seconds_count{method="GET",path="/users/:id"} 3"#));
    assert!(has_line(&out, r#"tmpl_http_requests_in_progress{method="GET",path="/users/:id"} 0.0"#));
    assert!(!out.contains(r#"path="/users/1""#));
    assert!(!out.contains("tmpl_http_errors_total"));
}

#[tokio::test]
async fn untracked_routes_fall_back_to_literal_path() {
    let (router, reg) = build(ServerConfig::default(), "untracked");
    call(&router, "/raw/7").await;
    assert!(has_line(
        &reg.export(),
        r#"untracked_http_requests_total{method="GET",path="/raw/7",status="200"} 1"#
    ));
}

#[tokio::test]
async fn excluded_paths_are_not_recorded() {
    let (router, reg) = build(ServerConfig::default(), "excl");
    assert_eq!(call(&router, "/metrics").await.status(), StatusCode::OK);
    assert_eq!(call(&router, "/healthz").await.status(), StatusCode::OK);
    assert_eq!(call(&router, "/readyz").await.status(), StatusCode::OK);

    let out = reg.export();
    assert!(!out.contains("excl_http_requests_total"));
    assert!(!out.contains("excl_http_requests_in_progress"));
}

#[tokio::test]
async fn tagged_failure_is_counted_under_its_type_name() {
    let (router, reg) = build(ServerConfig::default(), "tagged");
    let res = call(&router, "/value-error").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let out = reg.export();
    assert!(has_line(
        &out,
        r#"tagged_http_errors_total{method="GET",path="/value-error",error_type="ValueError"} 1"#
    ));
    assert!(has_line(
        &out,
        r#"tagged_http_requests_total{method="GET",path="/value-error",status="500"} 1"#
    ));
    assert!(has_line(&out, r#"tagged_http_requests_in_progress{method="GET",path="/value-error"} 0.0"#));
}

#[tokio::test]
async fn api_error_5xx_uses_variant_name_and_hides_detail() {
    let (router, reg) = build(ServerConfig::default(), "apierr");
    let res = call(&router, "/internal").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["code"], "INTERNAL");
    assert!(!v["msg"].as_str().unwrap().contains("db down"));

    assert!(has_line(
        &reg.export(),
        r#"apierr_http_errors_total{method="GET",path="/internal",error_type="Internal"} 1"#
    ));
}

#[tokio::test]
async fn client_errors_are_not_error_counted() {
    let (router, reg) = build(ServerConfig::default(), "clienterr");
    assert_eq!(call(&router, "/missing").await.status(), StatusCode::NOT_FOUND);

    let out = reg.export();
    assert!(has_line(
        &out,
        r#"clienterr_http_requests_total{method="GET",path="/missing",status="404"} 1"#
    ));
    assert!(!out.contains("clienterr_http_errors_total"));
}

#[tokio::test]
async fn untagged_5xx_is_counted_as_http_5xx() {
    let (router, reg) = build(ServerConfig::default(), "plain5xx");
    assert_eq!(call(&router, "/unavailable").await.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(has_line(
        &reg.export(),
        r#"plain5xx_http_errors_total{method="GET",path="/unavailable",error_type="http_5xx"} 1"#
    ));
}

#[tokio::test]
async fn panic_is_recorded_and_propagated() {
    let (router, reg) = build(ServerConfig::default(), "panicky");
    let handle = tokio::spawn(async move {
        router
            .oneshot(Request::builder().uri("/panic").body(Body::empty()).unwrap())
            .await
    });
    let err = handle.await.expect_err("panic must propagate");
    assert!(err.is_panic());

    let out = reg.export();
    assert!(has_line(
        &out,
        r#"panicky_http_errors_total{method="GET",path="/panic",error_type="panic"} 1"#
    ));
    assert!(has_line(
        &out,
        r#"panicky_http_requests_total{method="GET",path="/panic",status="500"} 1"#
    ));
    assert!(has_line(&out, r#"panicky_http_requests_in_progress{method="GET",path="/panic"} 0.0"#));
}

#[tokio::test]
async fn prefix_applies_to_templates() {
    let mut cfg = ServerConfig::default();
    cfg.app.prefix = "/api".into();
    let (router, reg) = build(cfg, "prefixed");
    assert_eq!(call(&router, "/api/users/9").await.status(), StatusCode::OK);
    assert_eq!(call(&router, "/users/9").await.status(), StatusCode::NOT_FOUND);

    assert!(has_line(
        &reg.export(),
        r#"prefixed_http_requests_total{method="GET",path="/api/users/:id",status="200"} 1"#
    ));
}

#[tokio::test]
async fn disabled_metrics_record_nothing_and_hide_endpoint() {
    let mut cfg = ServerConfig::default();
    cfg.metrics.enabled = false;
    let (router, reg) = build(cfg, "disabled");
    call(&router, "/users/1").await;
    assert_eq!(call(&router, "/metrics").await.status(), StatusCode::NOT_FOUND);
    assert!(!reg.export().contains("disabled_http_requests_total"));
}

#[tokio::test]
async fn build_sets_app_info() {
    let mut cfg = ServerConfig::default();
    cfg.app.version = "2.0.1".into();
    let (_router, reg) = build(cfg, "info");
    let out = reg.export();
    let line = out.lines().find(|l| l.starts_with("info_app_info{")).unwrap();
    assert!(line.starts_with(r#"info_app_info{version="2.0.1",apistrap_version=""#));
    assert!(line.ends_with("} 1"));
}

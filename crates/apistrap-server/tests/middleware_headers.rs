//! Request id, timing, security headers, body limit and access logging.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::Extension,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    response::Response,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use apistrap_core::metrics::MetricsRegistry;
use apistrap_server::config::{ServerConfig, Stage};
use apistrap_server::middleware::RequestId;
use apistrap_server::AppBuilder;

async fn whoami(Extension(id): Extension<RequestId>) -> String {
    id.as_str().to_owned()
}

async fn echo(Json(v): Json<Value>) -> Json<Value> {
    Json(v)
}

fn router(cfg: ServerConfig, name: &str) -> Router {
    AppBuilder::new(cfg)
        .route("GET", "/whoami", whoami)
        .route("POST", "/echo", echo)
        .with_registry(Arc::new(MetricsRegistry::new(name)))
        .build()
        .unwrap()
        .router()
}

async fn send(router: &Router, req: Request<Body>) -> Response {
    router.clone().oneshot(req).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn request_id_is_generated_and_echoed() {
    let r = router(ServerConfig::default(), "rid_gen");
    let res = send(&r, get("/whoami")).await;
    let header = res.headers().get("x-request-id").unwrap().to_str().unwrap().to_owned();
    assert_eq!(header.len(), 36);

    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, header.as_bytes());
}

#[tokio::test]
async fn incoming_request_id_is_reused() {
    let r = router(ServerConfig::default(), "rid_reuse");
    let req = Request::builder()
        .uri("/whoami")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let res = send(&r, req).await;
    assert_eq!(res.headers()["x-request-id"], "abc-123");
    assert_eq!(to_bytes(res.into_body(), usize::MAX).await.unwrap(), "abc-123");
}

#[tokio::test]
async fn custom_request_id_header() {
    let mut cfg = ServerConfig::default();
    cfg.request_id.header = "x-trace-id".into();
    let r = router(cfg, "rid_custom");
    let res = send(&r, get("/healthz")).await;
    assert!(res.headers().contains_key("x-trace-id"));
    assert!(!res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn response_time_header_format() {
    let r = router(ServerConfig::default(), "timing");
    let res = send(&r, get("/healthz")).await;
    let value = res.headers()["x-response-time"].to_str().unwrap();
    let ms = value.strip_suffix("ms").unwrap();
    let (_, decimals) = ms.split_once('.').unwrap();
    assert_eq!(decimals.len(), 2);
    assert!(ms.parse::<f64>().unwrap() >= 0.0);
}

#[tokio::test]
async fn timing_can_be_disabled() {
    let mut cfg = ServerConfig::default();
    cfg.timing.enabled = false;
    let r = router(cfg, "timing_off");
    let res = send(&r, get("/healthz")).await;
    assert!(!res.headers().contains_key("x-response-time"));
}

#[tokio::test]
async fn security_headers_skipped_in_dev() {
    let r = router(ServerConfig::default(), "sec_dev");
    let res = send(&r, get("/healthz")).await;
    assert!(!res.headers().contains_key("x-frame-options"));
    assert!(!res.headers().contains_key("strict-transport-security"));
}

#[tokio::test]
async fn security_headers_in_prod() {
    let mut cfg = ServerConfig::default();
    cfg.app.stage = Stage::Prod;
    cfg.security.hsts_preload = true;
    cfg.security.permissions_policy = String::new();
    let r = router(cfg, "sec_prod");
    let res = send(&r, get("/healthz")).await;
    let h = res.headers();
    assert_eq!(h["strict-transport-security"], "max-age=31536000; includeSubDomains; preload");
    assert_eq!(h["content-security-policy"], "default-src 'self'");
    assert_eq!(h["x-frame-options"], "DENY");
    assert_eq!(h["x-content-type-options"], "nosniff");
    assert_eq!(h["x-xss-protection"], "1; mode=block");
    assert_eq!(h["referrer-policy"], "strict-origin-when-cross-origin");
    assert!(!h.contains_key("permissions-policy"));
}

#[tokio::test]
async fn security_headers_in_dev_when_enabled() {
    let mut cfg = ServerConfig::default();
    cfg.security.enable_in_dev = true;
    cfg.security.hsts_max_age = 0;
    let r = router(cfg, "sec_dev_on");
    let res = send(&r, get("/healthz")).await;
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert!(!res.headers().contains_key("strict-transport-security"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut cfg = ServerConfig::default();
    cfg.security.max_request_bytes = 1024;
    let r = router(cfg, "limit");
    let req = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(CONTENT_TYPE, "application/json")
        .header("content-length", "4096")
        .body(Body::from(vec![b' '; 4096]))
        .unwrap();
    let res = send(&r, req).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, "Request body too large. Max size: 1024 bytes");
}

#[tokio::test]
async fn unparsable_content_length_passes_through() {
    let mut cfg = ServerConfig::default();
    cfg.security.max_request_bytes = 1024;
    let r = router(cfg, "limit_bad_len");
    let req = Request::builder()
        .uri("/healthz")
        .header("content-length", "lots")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&r, req).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn logged_json_bodies_reach_handler_and_client_unchanged() {
    let r = router(ServerConfig::default(), "access_log");
    let payload = json!({ "user": "ann", "password": "hunter2", "note": "x".repeat(5000) });
    let req = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();
    let res = send(&r, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let echoed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(echoed, payload);
}

//! Security response headers.
//!
//! Skipped in the `dev` stage unless `security.enable_in_dev` is set. Empty
//! configured values are omitted; HSTS is omitted when `hsts_max_age` is 0.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::app_state::AppState;
use crate::config::{SecurityConfig, Stage};

pub async fn security_headers(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let cfg = state.cfg();
    if cfg.app.stage == Stage::Dev && !cfg.security.enable_in_dev {
        return response;
    }
    apply(&cfg.security, response.headers_mut());
    response
}

fn apply(cfg: &SecurityConfig, headers: &mut HeaderMap) {
    if cfg.hsts_max_age > 0 {
        let mut hsts = format!("max-age={}", cfg.hsts_max_age);
        if cfg.hsts_include_subdomains {
            hsts.push_str("; includeSubDomains");
        }
        if cfg.hsts_preload {
            hsts.push_str("; preload");
        }
        set(headers, "strict-transport-security", &hsts);
    }
    set(headers, "content-security-policy", &cfg.content_security_policy);
    set(headers, "x-frame-options", &cfg.x_frame_options);
    set(headers, "x-content-type-options", &cfg.x_content_type_options);
    set(headers, "x-xss-protection", "1; mode=block");
    set(headers, "referrer-policy", &cfg.referrer_policy);
    set(headers, "permissions-policy", &cfg.permissions_policy);
}

fn set(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if value.is_empty() {
        return;
    }
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(HeaderName::from_static(name), v);
        }
        Err(_) => tracing::warn!(header = name, "skipping security header with invalid value"),
    }
}

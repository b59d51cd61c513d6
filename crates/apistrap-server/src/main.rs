//! apistrap demo server.
//!
//! Loads `apistrap.yaml` when present (defaults otherwise), applies
//! environment overrides and serves a few demo routes behind the full
//! middleware stack.

use axum::{extract::Path, Json};
use serde_json::{json, Value};

use apistrap_core::error::{ApiStrapError, Result};
use apistrap_server::{config, logging, ApiResult, AppBuilder};

async fn hello() -> Json<Value> {
    Json(json!({ "message": "hello" }))
}

async fn get_user(Path(id): Path<u64>) -> ApiResult<Json<Value>> {
    if id == 0 {
        return Err(ApiStrapError::NotFound(format!("user {id}")).into());
    }
    Ok(Json(json!({ "id": id, "name": format!("user-{id}") })))
}

async fn boom() -> ApiResult<Json<Value>> {
    Err(ApiStrapError::Internal("demo failure".into()).into())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load("apistrap.yaml")?;
    logging::init_logging(&cfg.logging)?;

    let listen = cfg.app.listen.clone();
    let app = AppBuilder::new(cfg)
        .route("GET", "/hello", hello)
        .route("GET", "/users/:id", get_user)
        .route("GET", "/boom", boom)
        .build()?;

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .map_err(|e| ApiStrapError::Config(format!("bind {listen} failed: {e}")))?;
    app.serve(listener).await
}

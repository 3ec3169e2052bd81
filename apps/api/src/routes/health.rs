use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::extract::{first_param, ApiQuery, QueryPairs};
use crate::state::AppState;

/// GET /health
/// Liveness; `?db=1` also round-trips the database.
pub async fn health_handler(
    State(state): State<AppState>,
    ApiQuery(params): QueryPairs,
) -> Result<Json<Value>, AppError> {
    let probe_db = first_param(&params, "db").is_some_and(|v| !v.is_empty());
    if !probe_db {
        return Ok(Json(json!({ "ok": true })));
    }

    state.store.ping().await.map_err(AppError::DbHealth)?;
    Ok(Json(json!({ "ok": true, "db": "up" })))
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub runtime: String,
    pub build: &'static str,
}

/// GET /version
pub async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        runtime: format!(
            "rust ({}-{})",
            std::env::consts::OS,
            std::env::consts::ARCH
        ),
        build: option_env!("BUILD_ID").unwrap_or("unknown"),
    })
}

//! Single-origin CORS policy.
//!
//! Requests without an `Origin` header (curl, server-to-server) always pass.
//! A browser request from any origin other than `ALLOWED_ORIGIN` is refused
//! before routing; `tower_http::cors` then adds the response headers for the
//! allowed one.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, request::Parts, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

pub fn origin_allowed(origin: Option<&HeaderValue>, allowed: &str) -> bool {
    match origin {
        None => true,
        Some(value) => value.as_bytes() == allowed.as_bytes(),
    }
}

pub async fn origin_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let origin = req.headers().get(header::ORIGIN);
    if !origin_allowed(origin, &state.config.allowed_origin) {
        let origin = origin
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<non-ascii>")
            .to_string();
        warn!(origin = %origin, "Rejected request from disallowed origin");
        return Err(AppError::OriginNotAllowed(origin));
    }
    Ok(next.run(req).await)
}

pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let allowed = allowed_origin.to_string();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| origin.as_bytes() == allowed.as_bytes(),
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(false)
        .max_age(Duration::from_secs(600))
}

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Origin not allowed: {0}")]
    OriginNotAllowed(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Database error: {0}")]
    Database(#[from] StoreError),

    #[error("Database health check failed: {0}")]
    DbHealth(StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// The error half of a response, before the request id is known.
///
/// `AppError::into_response` attaches this as a response extension; the
/// request-context middleware re-renders it with `requestId` and, outside
/// production, the debug fields.
#[derive(Debug, Clone)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
    /// Replaces `message` outside production.
    pub debug_message: Option<String>,
    /// Full error chain, exposed as `stack` outside production. Store errors
    /// only ever set this, never `debug_message`.
    pub stack: Option<String>,
}

impl ErrorEnvelope {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            debug_message: None,
            stack: None,
        }
    }

    fn with_stack(mut self, err: &(dyn std::error::Error + 'static)) -> Self {
        self.stack = Some(error_chain(err));
        self
    }

    fn with_debug(mut self, err: &(dyn std::error::Error + 'static)) -> Self {
        self.debug_message = Some(err.to_string());
        self.with_stack(err)
    }

    pub fn to_json(&self, request_id: Option<&str>, production: bool) -> Value {
        let mut error = Map::new();
        error.insert("code".into(), json!(self.code));
        let message = match (&self.debug_message, production) {
            (Some(debug), false) => debug.clone(),
            _ => self.message.clone(),
        };
        error.insert("message".into(), json!(message));
        if let Some(id) = request_id {
            error.insert("requestId".into(), json!(id));
        }
        if let (Some(stack), false) = (&self.stack, production) {
            error.insert("stack".into(), json!(stack));
        }
        json!({ "error": error })
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, envelope) = match &self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorEnvelope::new("BAD_REQUEST", msg.clone()),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorEnvelope::new("NOT_FOUND", msg.clone()),
            ),
            AppError::OriginNotAllowed(_) => (
                StatusCode::FORBIDDEN,
                ErrorEnvelope::new("CORS_ORIGIN_NOT_ALLOWED", "CORS: Origin not allowed"),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorEnvelope::new("PAYLOAD_TOO_LARGE", "Request body too large"),
            ),
            AppError::Database(e) => {
                e.log_diagnostics("Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorEnvelope::new("DATABASE_ERROR", "A database error occurred")
                        .with_stack(e),
                )
            }
            AppError::DbHealth(e) => {
                e.log_diagnostics("DB healthcheck failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorEnvelope::new("DB_HEALTH_FAILED", "Database unreachable").with_stack(e),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Unhandled error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorEnvelope::new("INTERNAL_ERROR", "Internal server error")
                        .with_debug(&**e),
                )
            }
        };

        // Production-shaped fallback body; replaced once the request id is known.
        let body = Json(envelope.to_json(None, true));
        let mut response = (status, body).into_response();
        response.extensions_mut().insert(envelope);
        response
    }
}

/// Re-renders an error response produced by `AppError` so its envelope
/// carries the request id. Responses without an envelope pass through.
pub fn finalize_error_response(response: Response, request_id: &str, production: bool) -> Response {
    let Some(envelope) = response.extensions().get::<ErrorEnvelope>().cloned() else {
        return response;
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = Json(envelope.to_json(Some(request_id), production)).into_response();
    let (body_parts, body) = body.into_parts();
    for (name, value) in body_parts.headers.iter() {
        parts.headers.insert(name.clone(), value.clone());
    }
    Response::from_parts(parts, body)
}

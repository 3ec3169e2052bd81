//! Correlation ids.
//!
//! The inbound `x-request-id` is reused whenever it is non-blank text, otherwise a
//! UUID v4 is minted. The id is stored as a request extension (picked up by
//! the trace span), echoed as a response header, and stamped into every
//! error envelope.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::errors::finalize_error_response;
use crate::state::AppState;

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn inbound_request_id(req: &Request) -> Option<String> {
    let value = req.headers().get(X_REQUEST_ID)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

pub async fn request_context(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let id = inbound_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(id.clone()));

    let response = next.run(req).await;
    let mut response = finalize_error_response(response, &id, state.config.is_production());

    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(X_REQUEST_ID), value);
    }
    response
}

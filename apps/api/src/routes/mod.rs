pub mod best;
pub mod health;
pub mod users;

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::get,
    Router,
};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::errors::AppError;
use crate::middleware::origin::{cors_layer, origin_guard};
use crate::middleware::request_id::{request_context, RequestId};
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 100 * 1024;

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let request_id = req
                .extensions()
                .get::<RequestId>()
                .map(RequestId::as_str)
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %request_id,
            )
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/version", get(health::version_handler))
        .route(
            "/api/best/:segment_id",
            get(best::handle_get_best).post(best::handle_upsert_best),
        )
        .route(
            "/api/users",
            get(users::handle_list_users).post(users::handle_upsert_user),
        )
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&state.config.allowed_origin))
        .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
        .layer(trace)
        .layer(middleware::from_fn_with_state(state.clone(), request_context))
        .with_state(state)
}

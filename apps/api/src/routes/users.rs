use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::extract::{first_param, ApiJson, ApiQuery, QueryPairs};
use crate::models::user::{User, UserUpsert};
use crate::state::AppState;
use crate::validation::{clamp_take, parse_optional_text, parse_strava_id};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubmission {
    pub strava_id: Option<Value>,
    pub email: Option<Value>,
    pub name: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UserUpsertResponse {
    pub status: &'static str,
    pub user: User,
}

/// GET /api/users?take=N
/// `take` is read leniently: anything unusable falls back to the default.
pub async fn handle_list_users(
    State(state): State<AppState>,
    ApiQuery(params): QueryPairs,
) -> Result<Json<Vec<User>>, AppError> {
    let take = clamp_take(first_param(&params, "take"));
    let users = state.store.list_users(take).await?;
    Ok(Json(users))
}

/// POST /api/users
/// Called from the sign-in callback; the external id is trusted as given.
pub async fn handle_upsert_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UserSubmission>,
) -> Result<Json<UserUpsertResponse>, AppError> {
    let upsert = UserUpsert {
        strava_id: parse_strava_id(body.strava_id.as_ref())?,
        email: parse_optional_text("email", body.email.as_ref())?,
        name: parse_optional_text("name", body.name.as_ref())?,
    };

    let user = state.store.upsert_user(upsert).await?;
    info!(strava_id = %user.strava_id, "User upserted");

    Ok(Json(UserUpsertResponse { status: "ok", user }))
}

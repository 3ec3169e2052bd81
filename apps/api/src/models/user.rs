use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::ids::BigId;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct User {
    pub id: BigId,
    pub strava_id: BigId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile data from a sign-in callback, keyed by the external platform id.
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpsert {
    pub strava_id: BigId,
    pub email: Option<String>,
    pub name: Option<String>,
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::ids::BigId;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct SegmentBestWindScore {
    pub id: BigId,
    pub segment_id: BigId,
    pub best_wind_score: f64,
    pub best_at: DateTime<Utc>,
}

/// A validated score submission for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreCandidate {
    pub score: f64,
    pub achieved_at: DateTime<Utc>,
}

/// Outcome of a conditional best-score upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertStatus {
    Created,
    Updated,
    Unchanged,
}

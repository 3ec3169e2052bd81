use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::models::ids::BigId;
use crate::models::segment_best::{ScoreCandidate, SegmentBestWindScore, UpsertStatus};
use crate::state::AppState;
use crate::validation::{parse_score, parse_segment_id, parse_timestamp};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestResponse {
    pub segment_id: BigId,
    pub best: SegmentBestWindScore,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestUpsertResponse {
    pub segment_id: BigId,
    pub status: UpsertStatus,
    pub best: SegmentBestWindScore,
}

/// Fields are kept loose so validation can report each one with a proper
/// `BAD_REQUEST` instead of a generic deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestSubmission {
    pub best_wind_score: Option<Value>,
    pub best_at: Option<Value>,
}

/// GET /api/best/:segmentId
pub async fn handle_get_best(
    State(state): State<AppState>,
    ApiPath(segment_id): ApiPath<String>,
) -> Result<Json<BestResponse>, AppError> {
    let segment_id = parse_segment_id(&segment_id)?;
    let best = state
        .store
        .find_best(segment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No score for segment".to_string()))?;
    Ok(Json(BestResponse { segment_id, best }))
}

/// POST /api/best/:segmentId
pub async fn handle_upsert_best(
    State(state): State<AppState>,
    ApiPath(segment_id): ApiPath<String>,
    ApiJson(body): ApiJson<BestSubmission>,
) -> Result<Json<BestUpsertResponse>, AppError> {
    let segment_id = parse_segment_id(&segment_id)?;
    let candidate = ScoreCandidate {
        score: parse_score(body.best_wind_score.as_ref())?,
        achieved_at: parse_timestamp(body.best_at.as_ref())?,
    };

    let outcome = state.store.upsert_best(segment_id, candidate).await?;
    info!(
        segment_id = %segment_id,
        status = ?outcome.status,
        best_wind_score = outcome.best.best_wind_score,
        "Best score submission processed"
    );

    Ok(Json(BestUpsertResponse {
        segment_id,
        status: outcome.status,
        best: outcome.best,
    }))
}

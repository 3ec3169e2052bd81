//! Persistence gateway.
//!
//! Handlers only see the `Store` trait. `PgStore` is the production backend;
//! tests swap in `MemoryStore`.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ids::BigId;
use crate::models::segment_best::{ScoreCandidate, SegmentBestWindScore, UpsertStatus};
use crate::models::user::{User, UserUpsert};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("best-score upsert for segment {segment_id} still conflicting after {attempts} attempts")]
    UpsertConflict { segment_id: BigId, attempts: u32 },
}

impl StoreError {
    /// Emits the driver-level diagnostics for this error. Never includes the
    /// connection string.
    pub fn log_diagnostics(&self, context: &str) {
        match self {
            StoreError::Sqlx(sqlx::Error::Database(db_err)) => {
                let code = db_err.code();
                tracing::error!(
                    code = code.as_deref().unwrap_or("unknown"),
                    constraint = db_err.constraint().unwrap_or(""),
                    table = db_err.table().unwrap_or(""),
                    driver = "sqlx-postgres",
                    service_version = env!("CARGO_PKG_VERSION"),
                    error = %db_err.message(),
                    "{context}"
                );
            }
            StoreError::Sqlx(e) => {
                tracing::error!(
                    kind = sqlx_error_kind(e),
                    driver = "sqlx-postgres",
                    service_version = env!("CARGO_PKG_VERSION"),
                    error = %e,
                    "{context}"
                );
            }
            other => {
                tracing::error!(
                    service_version = env!("CARGO_PKG_VERSION"),
                    error = %other,
                    "{context}"
                );
            }
        }
    }
}

fn sqlx_error_kind(e: &sqlx::Error) -> &'static str {
    match e {
        sqlx::Error::Configuration(_) => "configuration",
        sqlx::Error::Io(_) => "io",
        sqlx::Error::Tls(_) => "tls",
        sqlx::Error::Protocol(_) => "protocol",
        sqlx::Error::RowNotFound => "row_not_found",
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => "decode",
        sqlx::Error::PoolTimedOut => "pool_timed_out",
        sqlx::Error::PoolClosed => "pool_closed",
        sqlx::Error::WorkerCrashed => "worker_crashed",
        sqlx::Error::Migrate(_) => "migrate",
        _ => "other",
    }
}

/// Result of `Store::upsert_best`: the row as stored after the transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct BestUpsert {
    pub best: SegmentBestWindScore,
    pub status: UpsertStatus,
}

/// What a best-score submission does to the current row.
#[derive(Debug, PartialEq)]
pub enum BestDecision<'a> {
    Insert,
    Raise(&'a SegmentBestWindScore),
    Keep(&'a SegmentBestWindScore),
}

/// Only a strictly greater score replaces the stored one, so ties keep the
/// earlier timestamp.
pub fn decide<'a>(
    current: Option<&'a SegmentBestWindScore>,
    candidate: &ScoreCandidate,
) -> BestDecision<'a> {
    match current {
        None => BestDecision::Insert,
        Some(row) if candidate.score > row.best_wind_score => BestDecision::Raise(row),
        Some(row) => BestDecision::Keep(row),
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Trivial round-trip used by the health check.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_best(&self, segment_id: BigId)
        -> Result<Option<SegmentBestWindScore>, StoreError>;

    /// Atomically keeps the maximum score seen for `segment_id`.
    async fn upsert_best(
        &self,
        segment_id: BigId,
        candidate: ScoreCandidate,
    ) -> Result<BestUpsert, StoreError>;

    async fn upsert_user(&self, user: UserUpsert) -> Result<User, StoreError>;

    /// Most recently created users first.
    async fn list_users(&self, take: i64) -> Result<Vec<User>, StoreError>;
}

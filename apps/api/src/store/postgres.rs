use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::models::ids::BigId;
use crate::models::segment_best::{ScoreCandidate, SegmentBestWindScore, UpsertStatus};
use crate::models::user::{User, UserUpsert};
use crate::store::{decide, BestDecision, BestUpsert, Store, StoreError};

/// Attempts per best-score upsert. A retry happens only when a concurrent
/// insert for the same segment won the unique constraint.
const MAX_UPSERT_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One transactional read-modify-write. The `FOR UPDATE` lock serialises
    /// writers on an existing row; concurrent first inserts collide on the
    /// unique constraint instead.
    async fn try_upsert_best(
        &self,
        segment_id: BigId,
        candidate: &ScoreCandidate,
    ) -> Result<BestUpsert, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let current: Option<SegmentBestWindScore> = sqlx::query_as(
            r#"
            SELECT "id", "segmentId", "bestWindScore", "bestAt"
            FROM "SegmentBestWindScore"
            WHERE "segmentId" = $1
            ORDER BY "bestWindScore" DESC, "id" DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(segment_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match decide(current.as_ref(), candidate) {
            BestDecision::Insert => {
                let best: SegmentBestWindScore = sqlx::query_as(
                    r#"
                    INSERT INTO "SegmentBestWindScore" ("segmentId", "bestWindScore", "bestAt")
                    VALUES ($1, $2, $3)
                    RETURNING "id", "segmentId", "bestWindScore", "bestAt"
                    "#,
                )
                .bind(segment_id)
                .bind(candidate.score)
                .bind(candidate.achieved_at)
                .fetch_one(&mut *tx)
                .await?;
                BestUpsert {
                    best,
                    status: UpsertStatus::Created,
                }
            }
            BestDecision::Raise(row) => {
                let best: SegmentBestWindScore = sqlx::query_as(
                    r#"
                    UPDATE "SegmentBestWindScore"
                    SET "bestWindScore" = $1, "bestAt" = $2
                    WHERE "id" = $3
                    RETURNING "id", "segmentId", "bestWindScore", "bestAt"
                    "#,
                )
                .bind(candidate.score)
                .bind(candidate.achieved_at)
                .bind(row.id)
                .fetch_one(&mut *tx)
                .await?;
                BestUpsert {
                    best,
                    status: UpsertStatus::Updated,
                }
            }
            BestDecision::Keep(row) => BestUpsert {
                best: row.clone(),
                status: UpsertStatus::Unchanged,
            },
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_best(
        &self,
        segment_id: BigId,
    ) -> Result<Option<SegmentBestWindScore>, StoreError> {
        Ok(sqlx::query_as::<_, SegmentBestWindScore>(
            r#"
            SELECT "id", "segmentId", "bestWindScore", "bestAt"
            FROM "SegmentBestWindScore"
            WHERE "segmentId" = $1
            ORDER BY "bestWindScore" DESC, "id" DESC
            LIMIT 1
            "#,
        )
        .bind(segment_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_best(
        &self,
        segment_id: BigId,
        candidate: ScoreCandidate,
    ) -> Result<BestUpsert, StoreError> {
        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            match self.try_upsert_best(segment_id, &candidate).await {
                Ok(outcome) => {
                    debug!(
                        segment_id = %segment_id,
                        status = ?outcome.status,
                        attempt,
                        "Best score upsert committed"
                    );
                    return Ok(outcome);
                }
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    warn!(
                        segment_id = %segment_id,
                        attempt,
                        constraint = db_err.constraint().unwrap_or(""),
                        "Concurrent insert for segment, retrying as update"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::UpsertConflict {
            segment_id,
            attempts: MAX_UPSERT_ATTEMPTS,
        })
    }

    async fn upsert_user(&self, user: UserUpsert) -> Result<User, StoreError> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            INSERT INTO "User" ("id", "stravaId", "email", "name", "createdAt", "updatedAt")
            VALUES ($1, $1, $2, $3, now(), now())
            ON CONFLICT ("stravaId") DO UPDATE
            SET "email" = COALESCE(EXCLUDED."email", "User"."email"),
                "name" = COALESCE(EXCLUDED."name", "User"."name"),
                "updatedAt" = now()
            RETURNING "id", "stravaId", "email", "name", "createdAt", "updatedAt"
            "#,
        )
        .bind(user.strava_id)
        .bind(user.email)
        .bind(user.name)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_users(&self, take: i64) -> Result<Vec<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            SELECT "id", "stravaId", "email", "name", "createdAt", "updatedAt"
            FROM "User"
            ORDER BY "createdAt" DESC, "id" DESC
            LIMIT $1
            "#,
        )
        .bind(take)
        .fetch_all(&self.pool)
        .await?)
    }
}

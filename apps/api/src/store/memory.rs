use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::ids::BigId;
use crate::models::segment_best::{ScoreCandidate, SegmentBestWindScore, UpsertStatus};
use crate::models::user::{User, UserUpsert};
use crate::store::{decide, BestDecision, BestUpsert, Store, StoreError};

#[derive(Default)]
struct Tables {
    bests: Vec<SegmentBestWindScore>,
    users: Vec<User>,
    next_best_id: i64,
}

/// In-memory `Store` for handler tests. Counts every call so tests can
/// assert that validation failures never reach storage.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    calls: AtomicUsize,
    down: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail as if the database were unreachable.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn best_rows(&self, segment_id: BigId) -> Vec<SegmentBestWindScore> {
        let tables = self.tables.lock().unwrap();
        tables
            .bests
            .iter()
            .filter(|r| r.segment_id == segment_id)
            .cloned()
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.enter()
    }

    async fn find_best(
        &self,
        segment_id: BigId,
    ) -> Result<Option<SegmentBestWindScore>, StoreError> {
        self.enter()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .bests
            .iter()
            .find(|r| r.segment_id == segment_id)
            .cloned())
    }

    async fn upsert_best(
        &self,
        segment_id: BigId,
        candidate: ScoreCandidate,
    ) -> Result<BestUpsert, StoreError> {
        self.enter()?;
        let mut tables = self.tables.lock().unwrap();
        let index = tables.bests.iter().position(|r| r.segment_id == segment_id);
        let current = index.map(|i| tables.bests[i].clone());

        let outcome = match decide(current.as_ref(), &candidate) {
            BestDecision::Insert => {
                tables.next_best_id += 1;
                let best = SegmentBestWindScore {
                    id: BigId(tables.next_best_id),
                    segment_id,
                    best_wind_score: candidate.score,
                    best_at: candidate.achieved_at,
                };
                tables.bests.push(best.clone());
                BestUpsert {
                    best,
                    status: UpsertStatus::Created,
                }
            }
            BestDecision::Raise(row) => {
                let best = SegmentBestWindScore {
                    best_wind_score: candidate.score,
                    best_at: candidate.achieved_at,
                    ..row.clone()
                };
                if let Some(i) = index {
                    tables.bests[i] = best.clone();
                }
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
        Ok(outcome)
    }

    async fn upsert_user(&self, user: UserUpsert) -> Result<User, StoreError> {
        self.enter()?;
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = tables
            .users
            .iter_mut()
            .find(|u| u.strava_id == user.strava_id)
        {
            if user.email.is_some() {
                existing.email = user.email;
            }
            if user.name.is_some() {
                existing.name = user.name;
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = User {
            id: user.strava_id,
            strava_id: user.strava_id,
            email: user.email,
            name: user.name,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn list_users(&self, take: i64) -> Result<Vec<User>, StoreError> {
        self.enter()?;
        let tables = self.tables.lock().unwrap();
        let mut users = tables.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        users.truncate(usize::try_from(take).unwrap_or(0));
        Ok(users)
    }
}

//! Persistence seam for the pipeline.
//!
//! The scheduler and stage runner only see this trait; production wires in
//! the Postgres implementation, tests use the in-memory store from
//! `kernel::test_dependencies`. All mutation of lecture rows during
//! processing goes through here, under the scheduler's claim gate.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::lectures::{Lecture, LectureCounts};
use crate::domains::tasks::{NewTask, Task};
use crate::domains::users::User;

#[async_trait]
pub trait LectureStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lecture>>;

    /// Eligible lectures ordered by creation time, oldest first. Attempts
    /// older than `stale_before` count as eligible (staleness retry).
    async fn find_candidates(
        &self,
        limit: i64,
        stale_before: DateTime<Utc>,
    ) -> Result<Vec<Lecture>>;

    /// The single-flight gate: atomically mark an attempt started by
    /// writing `last_attempt_at = now`, only if the lecture is still
    /// unprocessed, has audio, and no attempt newer than `stale_before`
    /// exists. Implementations must make the check-and-write atomic
    /// (conditional UPDATE, not read-then-write).
    async fn claim_for_processing(
        &self,
        id: Uuid,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<Lecture>>;

    /// Clear stale claims, returning how many lectures were re-admitted.
    async fn release_stale(&self, stale_before: DateTime<Utc>) -> Result<u64>;

    async fn set_transcript(&self, id: Uuid, transcript: &str) -> Result<()>;
    async fn set_summary(&self, id: Uuid, summary: &str) -> Result<()>;
    async fn set_key_points(&self, id: Uuid, key_points: &str) -> Result<()>;

    /// Terminal, idempotent transition to Processed.
    async fn mark_processed(&self, id: Uuid) -> Result<()>;

    /// Insert fan-out output, returning how many tasks were created.
    async fn insert_tasks(&self, tasks: &[NewTask]) -> Result<u64>;

    /// Live query of fan-out recipients (student-role users).
    async fn find_students(&self) -> Result<Vec<User>>;

    async fn lecture_counts(&self) -> Result<LectureCounts>;

    async fn find_unprocessed(&self) -> Result<Vec<Lecture>>;
}

/// PostgreSQL-backed store, delegating to the model-owned queries.
pub struct PgLectureStore {
    pool: PgPool,
}

impl PgLectureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LectureStore for PgLectureStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lecture>> {
        Lecture::find_by_id(id, &self.pool).await
    }

    async fn find_candidates(
        &self,
        limit: i64,
        stale_before: DateTime<Utc>,
    ) -> Result<Vec<Lecture>> {
        Lecture::find_candidates(limit, stale_before, &self.pool).await
    }

    async fn claim_for_processing(
        &self,
        id: Uuid,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<Lecture>> {
        Lecture::claim_for_processing(id, stale_before, &self.pool).await
    }

    async fn release_stale(&self, stale_before: DateTime<Utc>) -> Result<u64> {
        Lecture::release_stale(stale_before, &self.pool).await
    }

    async fn set_transcript(&self, id: Uuid, transcript: &str) -> Result<()> {
        Lecture::set_transcript(id, transcript, &self.pool).await
    }

    async fn set_summary(&self, id: Uuid, summary: &str) -> Result<()> {
        Lecture::set_summary(id, summary, &self.pool).await
    }

    async fn set_key_points(&self, id: Uuid, key_points: &str) -> Result<()> {
        Lecture::set_key_points(id, key_points, &self.pool).await
    }

    async fn mark_processed(&self, id: Uuid) -> Result<()> {
        Lecture::mark_processed(id, &self.pool).await
    }

    async fn insert_tasks(&self, tasks: &[NewTask]) -> Result<u64> {
        Task::insert_batch(tasks, &self.pool).await
    }

    async fn find_students(&self) -> Result<Vec<User>> {
        User::find_students(&self.pool).await
    }

    async fn lecture_counts(&self) -> Result<LectureCounts> {
        Lecture::counts(&self.pool).await
    }

    async fn find_unprocessed(&self) -> Result<Vec<Lecture>> {
        Lecture::find_unprocessed(&self.pool).await
    }
}

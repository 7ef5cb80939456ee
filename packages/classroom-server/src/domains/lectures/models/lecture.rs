use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Lecture model - SQL persistence layer
///
/// The derived fields (transcript, summary, key_points) are written
/// independently as their pipeline stage completes, so a crashed attempt
/// keeps its partial progress. `last_attempt_at` is written at claim time
/// and is the single-flight gate; it is deliberately separate from
/// `updated_at` so a stalled attempt is distinguishable from a finished one.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Lecture {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub teacher_id: Uuid,

    pub audio_url: Option<String>,
    pub audio_duration: Option<i32>,

    // Derived artifacts, one per stage
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub key_points: Option<String>,

    pub is_processed: bool,
    pub last_attempt_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts for the processing status diagnostic
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct LectureCounts {
    pub total: i64,
    pub processed: i64,
    pub unprocessed_with_audio: i64,
}

impl Lecture {
    /// True when the pipeline may pick this lecture up: audio uploaded,
    /// not yet processed.
    pub fn is_eligible(&self) -> bool {
        !self.is_processed && self.audio_url.is_some()
    }

    /// Find lecture by ID
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM lectures WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find processing candidates: unprocessed lectures with audio whose
    /// last attempt (if any) started before `stale_before`, oldest first.
    pub async fn find_candidates(
        limit: i64,
        stale_before: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM lectures
             WHERE is_processed = false
               AND audio_url IS NOT NULL
               AND (last_attempt_at IS NULL OR last_attempt_at < $2)
             ORDER BY created_at ASC
             LIMIT $1",
        )
        .bind(limit)
        .bind(stale_before)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Atomically claim this lecture for a processing attempt.
    ///
    /// The conditional update IS the single-flight gate: it succeeds only if
    /// the lecture is still unprocessed, has audio, and has no in-flight
    /// attempt newer than `stale_before`. Returns None when another attempt
    /// holds the claim or the lecture was processed meanwhile.
    pub async fn claim_for_processing(
        id: Uuid,
        stale_before: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE lectures
             SET last_attempt_at = NOW(),
                 updated_at = NOW()
             WHERE id = $1
               AND is_processed = false
               AND audio_url IS NOT NULL
               AND (last_attempt_at IS NULL OR last_attempt_at < $2)
             RETURNING *",
        )
        .bind(id)
        .bind(stale_before)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Re-admit stale attempts: clear the claim on unprocessed lectures
    /// whose attempt started before `stale_before`. Returns rows affected.
    pub async fn release_stale(stale_before: DateTime<Utc>, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE lectures
             SET last_attempt_at = NULL
             WHERE is_processed = false
               AND last_attempt_at IS NOT NULL
               AND last_attempt_at < $1",
        )
        .bind(stale_before)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Persist the transcript for a lecture
    pub async fn set_transcript(id: Uuid, transcript: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE lectures SET transcript = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(transcript)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Persist the summary for a lecture
    pub async fn set_summary(id: Uuid, summary: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE lectures SET summary = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(summary)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Persist the joined key-points text for a lecture
    pub async fn set_key_points(id: Uuid, key_points: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE lectures SET key_points = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(key_points)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Terminal transition: mark the lecture processed
    pub async fn mark_processed(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE lectures SET is_processed = true, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Counts for the processing status diagnostic
    pub async fn counts(pool: &PgPool) -> Result<LectureCounts> {
        let (total, processed, unprocessed_with_audio): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE is_processed = true),
                COUNT(*) FILTER (WHERE is_processed = false AND audio_url IS NOT NULL)
             FROM lectures",
        )
        .fetch_one(pool)
        .await?;

        Ok(LectureCounts {
            total,
            processed,
            unprocessed_with_audio,
        })
    }

    /// All unprocessed lectures with audio (read-only diagnostic)
    pub async fn find_unprocessed(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM lectures
             WHERE is_processed = false AND audio_url IS NOT NULL
             ORDER BY created_at ASC",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

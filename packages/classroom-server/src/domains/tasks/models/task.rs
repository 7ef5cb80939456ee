use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Approved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

/// Task model - SQL persistence layer
///
/// AI-generated tasks are created by the fan-out step of the processing
/// pipeline and never mutated by it afterwards; status changes belong to
/// the task routes.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub lecture_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub is_ai_generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task row to be inserted (fan-out output)
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub lecture_id: Uuid,
    pub assigned_to_id: Uuid,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub is_ai_generated: bool,
}

impl Task {
    /// Insert a batch of new tasks, returning how many were created.
    pub async fn insert_batch(tasks: &[NewTask], pool: &PgPool) -> Result<u64> {
        let mut created = 0u64;
        let mut tx = pool.begin().await?;

        for task in tasks {
            let result = sqlx::query(
                "INSERT INTO tasks (
                    title, description, lecture_id, assigned_to_id,
                    status, priority, due_date, is_ai_generated
                 )
                 VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7)",
            )
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.lecture_id)
            .bind(task.assigned_to_id)
            .bind(task.priority)
            .bind(task.due_date)
            .bind(task.is_ai_generated)
            .execute(&mut *tx)
            .await?;

            created += result.rows_affected();
        }

        tx.commit().await?;

        Ok(created)
    }

    /// Tasks created from a lecture (back-reference lookup)
    pub async fn find_by_lecture(lecture_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM tasks WHERE lecture_id = $1 ORDER BY created_at",
        )
        .bind(lecture_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

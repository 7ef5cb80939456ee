use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Teacher,
    Student,
}

/// User model - SQL persistence layer (fields the pipeline touches)
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// All users with the student role.
    ///
    /// Task fan-out queries this live at fan-out time; if the role set
    /// changed since the descriptors were generated, the current set wins.
    pub async fn find_students(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE role = 'student' ORDER BY created_at")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Query lifecycle states. Stored as TEXT; the spelling here is also what
/// clients see in responses and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Unassigned,
    Requested,
    Assigned,
    Resolved,
    Dismantled,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Unassigned => "UNASSIGNED",
            QueryStatus::Requested => "REQUESTED",
            QueryStatus::Assigned => "ASSIGNED",
            QueryStatus::Resolved => "RESOLVED",
            QueryStatus::Dismantled => "DISMANTLED",
        }
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `requested_by` is dead schema kept for compatibility: no operation ever
/// sets it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Query {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: QueryStatus,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub requested_by: Option<Uuid>,
    pub answer: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub dismantled_reason: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub(crate) const COLUMNS: &str = "id, title, description, status, created_by, assigned_to, \
     requested_by, answer, resolved_by, dismantled_reason, created_at, updated_at";

impl Query {
    pub async fn insert(
        db: &PgPool,
        title: &str,
        description: &str,
        created_by: Uuid,
    ) -> sqlx::Result<Query> {
        sqlx::query_as::<_, Query>(&format!(
            "INSERT INTO queries (title, description, created_by) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        ))
        .bind(title)
        .bind(description)
        .bind(created_by)
        .fetch_one(db)
        .await
    }

    pub async fn find(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Query>> {
        sqlx::query_as::<_, Query>(&format!("SELECT {COLUMNS} FROM queries WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<Query>> {
        sqlx::query_as::<_, Query>(&format!(
            "SELECT {COLUMNS} FROM queries ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn list_created_by(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Query>> {
        sqlx::query_as::<_, Query>(&format!(
            "SELECT {COLUMNS} FROM queries WHERE created_by = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
    }
}

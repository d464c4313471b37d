use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Read paths are capped at this many rows per user.
const DISPLAY_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationKind {
    QueryAssigned,
    QueryResolved,
    QueryDismantled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub query_id: Uuid,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
}

const COLUMNS: &str = "id, user_id, message, kind, query_id, is_read, created_at";

impl Notification {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        message: &str,
        kind: NotificationKind,
        query_id: Uuid,
    ) -> sqlx::Result<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (user_id, message, kind, query_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        ))
        .bind(user_id)
        .bind(message)
        .bind(kind)
        .bind(query_id)
        .fetch_one(db)
        .await
    }

    pub async fn list_recent(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(DISPLAY_LIMIT)
        .fetch_all(db)
        .await
    }

    pub async fn unread_count(db: &PgPool, user_id: Uuid) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(db)
        .await
    }

    /// Flips is_read on the caller's own row; `None` when the id does not
    /// exist or belongs to someone else.
    pub async fn mark_read(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> sqlx::Result<Option<Notification>> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = TRUE \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn mark_all_read(db: &PgPool, user_id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationKind::QueryAssigned).unwrap(),
            "\"query_assigned\""
        );
        assert_eq!(
            serde_json::to_string(&NotificationKind::QueryDismantled).unwrap(),
            "\"query_dismantled\""
        );
    }
}

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of account roles. Stored as TEXT, serialized with the same
/// spelling the API has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Role {
    Participant,
    Admin,
    #[serde(rename = "Team_Head")]
    #[sqlx(rename = "Team_Head")]
    TeamHead,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Participant => "Participant",
            Role::Admin => "Admin",
            Role::TeamHead => "Team_Head",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
}

const COLUMNS: &str = "id, name, email, password_hash, role, is_verified, created_at";

impl User {
    pub async fn find(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
        is_verified: bool,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, role, is_verified) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(is_verified)
        .fetch_one(db)
        .await
    }

    pub async fn mark_verified(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Newest first; `role` narrows the listing, otherwise staff accounts
    /// (Admin and Team_Head) are returned.
    pub async fn list_staff(db: &PgPool, role: Option<Role>) -> sqlx::Result<Vec<User>> {
        match role {
            Some(role) => {
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {COLUMNS} FROM users WHERE role = $1 ORDER BY created_at DESC"
                ))
                .bind(role)
                .fetch_all(db)
                .await
            }
            None => {
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {COLUMNS} FROM users WHERE role IN ('Admin', 'Team_Head') \
                     ORDER BY created_at DESC"
                ))
                .fetch_all(db)
                .await
            }
        }
    }

    /// Unconditional delete, used to roll back a registration whose
    /// verification dispatch failed.
    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Delete guarded so the last remaining admin can never be removed. The
    /// admin count is evaluated inside the statement, closing the window a
    /// read-then-delete would leave open. Returns the deleted row's role, or
    /// `None` when the guard refused.
    pub async fn delete_guarded(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Role>> {
        let role = sqlx::query_scalar::<_, Role>(
            "DELETE FROM users WHERE id = $1 \
             AND (role <> 'Admin' OR (SELECT count(*) FROM users WHERE role = 'Admin') > 1) \
             RETURNING role",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(role)
    }

    pub async fn admin_exists(db: &PgPool) -> sqlx::Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM users WHERE role = 'Admin'",
        )
        .fetch_one(db)
        .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_serde_with_api_spelling() {
        assert_eq!(serde_json::to_string(&Role::TeamHead).unwrap(), "\"Team_Head\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Admin\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"Team_Head\"").unwrap(),
            Role::TeamHead
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"Participant\"").unwrap(),
            Role::Participant
        );
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: "secret-hash".into(),
            role: Role::Participant,
            is_verified: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}

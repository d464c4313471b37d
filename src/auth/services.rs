use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::auth::repo::{Role, User};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates the first admin account from `ADMIN_EMAIL`/`ADMIN_PASSWORD` when
/// no admin exists yet, so the admin-gated surface is reachable on a fresh
/// database.
pub async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (
        state.config.admin_email.as_deref(),
        state.config.admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    if User::admin_exists(&state.db).await? {
        return Ok(());
    }

    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(%email, "ADMIN_EMAIL is not a valid address; skipping bootstrap");
        return Ok(());
    }

    let hash = hash_password(password)?;
    let admin = User::create(
        &state.db,
        &state.config.admin_name,
        &email,
        &hash,
        Role::Admin,
        true,
    )
    .await?;
    info!(admin_id = %admin.id, %email, "bootstrap admin created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("head+fest@teams.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user @example.com"));
        assert!(!is_valid_email(""));
    }
}

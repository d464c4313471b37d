//! One-time verification codes for new registrations.
//!
//! The registry is an injected key-value abstraction (email -> pending code)
//! so the in-memory map can be swapped for Redis without touching callers.
//! Expiry is checked lazily at verification time; there is no background
//! sweep. Codes are single-use: a successful check consumes the entry.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;
use time::{Duration, OffsetDateTime};

pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Expired,
    Mismatch,
    Missing,
}

#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn put(&self, email: &str, code: String, ttl: Duration);
    async fn check(&self, email: &str, code: &str) -> OtpCheck;
    async fn remove(&self, email: &str);
}

struct PendingCode {
    code: String,
    expires_at: OffsetDateTime,
}

#[derive(Default)]
pub struct InMemoryOtpStore {
    entries: Mutex<HashMap<String, PendingCode>>,
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, email: &str, code: String, ttl: Duration) {
        let pending = PendingCode {
            code,
            expires_at: OffsetDateTime::now_utc() + ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(email.to_string(), pending);
    }

    async fn check(&self, email: &str, code: &str) -> OtpCheck {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(pending) = entries.get(email) else {
            return OtpCheck::Missing;
        };
        if OffsetDateTime::now_utc() > pending.expires_at {
            entries.remove(email);
            return OtpCheck::Expired;
        }
        if pending.code != code {
            return OtpCheck::Mismatch;
        }
        entries.remove(email);
        OtpCheck::Valid
    }

    async fn remove(&self, email: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(email);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::minutes(10);

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn valid_code_is_accepted_once() {
        let store = InMemoryOtpStore::default();
        store.put("a@example.com", "123456".into(), TTL).await;
        assert_eq!(store.check("a@example.com", "123456").await, OtpCheck::Valid);
        // consumed on success
        assert_eq!(
            store.check("a@example.com", "123456").await,
            OtpCheck::Missing
        );
    }

    #[tokio::test]
    async fn wrong_code_is_rejected_but_not_consumed() {
        let store = InMemoryOtpStore::default();
        store.put("a@example.com", "123456".into(), TTL).await;
        assert_eq!(
            store.check("a@example.com", "000000").await,
            OtpCheck::Mismatch
        );
        assert_eq!(store.check("a@example.com", "123456").await, OtpCheck::Valid);
    }

    #[tokio::test]
    async fn expired_code_is_rejected_and_removed() {
        let store = InMemoryOtpStore::default();
        store
            .put("a@example.com", "123456".into(), Duration::minutes(-1))
            .await;
        assert_eq!(
            store.check("a@example.com", "123456").await,
            OtpCheck::Expired
        );
        assert_eq!(
            store.check("a@example.com", "123456").await,
            OtpCheck::Missing
        );
    }

    #[tokio::test]
    async fn unknown_email_is_missing() {
        let store = InMemoryOtpStore::default();
        assert_eq!(
            store.check("nobody@example.com", "123456").await,
            OtpCheck::Missing
        );
    }

    #[tokio::test]
    async fn reissuing_replaces_the_previous_code() {
        let store = InMemoryOtpStore::default();
        store.put("a@example.com", "111111".into(), TTL).await;
        store.put("a@example.com", "222222".into(), TTL).await;
        assert_eq!(
            store.check("a@example.com", "111111").await,
            OtpCheck::Mismatch
        );
        assert_eq!(store.check("a@example.com", "222222").await, OtpCheck::Valid);
    }

    #[tokio::test]
    async fn remove_discards_the_pending_code() {
        let store = InMemoryOtpStore::default();
        store.put("a@example.com", "123456".into(), TTL).await;
        store.remove("a@example.com").await;
        assert_eq!(
            store.check("a@example.com", "123456").await,
            OtpCheck::Missing
        );
    }
}

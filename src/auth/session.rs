use moka::future::Cache;
use std::time::Duration;
use uuid::Uuid;

use crate::model::role::Role;

/// What the server remembers about a logged-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<u64>,
}

/// Server-side sessions keyed by an opaque token.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores the session and returns its new token.
    pub async fn create(&self, session: Session) -> String {
        let token = Uuid::new_v4().to_simple().to_string();
        self.sessions.insert(token.clone(), session).await;
        token
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).await
    }

    /// Idempotent.
    pub async fn revoke(&self, token: &str) {
        self.sessions.invalidate(token).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_id: 7,
            username: "admin".to_string(),
            role: Role::Admin,
            employee_id: None,
        }
    }

    #[actix_web::test]
    async fn created_session_is_found_by_token() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(session()).await;

        assert_eq!(token.len(), 32);
        assert_eq!(store.get(&token).await, Some(session()));
        assert_eq!(store.get("unknown").await, None);
    }

    #[actix_web::test]
    async fn revoked_session_is_gone() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(session()).await;

        store.revoke(&token).await;
        store.revoke(&token).await;
        assert_eq!(store.get(&token).await, None);
    }

    #[actix_web::test]
    async fn tokens_are_unique_per_login() {
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.create(session()).await;
        let b = store.create(session()).await;
        assert_ne!(a, b);
    }
}

//! Bearer-token sessions for staff logins.
//!
//! Only the SHA-256 digest of each token is kept; the raw token is handed
//! to the client once at login and never stored.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 digest of a token, the key under which sessions are stored.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub uid: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Token returned to the client at login.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: HashMap<[u8; 32], Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    pub fn issue(&mut self, uid: Uuid, now: DateTime<Utc>) -> IssuedSession {
        let token = generate_token();
        let expires_at = now + self.ttl;
        self.sessions.insert(
            hash_token(&token),
            Session {
                uid,
                issued_at: now,
                expires_at,
            },
        );
        IssuedSession { token, expires_at }
    }

    /// Session for a token, if it exists and has not expired.
    /// Expired entries are dropped on sight.
    pub fn validate(&mut self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let key = hash_token(token);
        let session = *self.sessions.get(&key)?;
        if now >= session.expires_at {
            self.sessions.remove(&key);
            return None;
        }
        Some(session)
    }

    /// Returns true if the token was live.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    /// Drops every session of one user. Returns how many were removed.
    pub fn revoke_user(&mut self, uid: &Uuid) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.uid != *uid);
        before - self.sessions.len()
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| now < s.expires_at);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
        assert_eq!(t1.len(), 43);
    }

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("test"), hash_token("test"));
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }

    #[test]
    fn issued_token_validates_until_expiry() {
        let mut store = SessionStore::new(Duration::hours(8));
        let uid = Uuid::new_v4();
        let issued = store.issue(uid, t0());
        assert_eq!(issued.expires_at, t0() + Duration::hours(8));

        let session = store.validate(&issued.token, t0() + Duration::hours(7)).unwrap();
        assert_eq!(session.uid, uid);
        assert!(store.validate(&issued.token, t0() + Duration::hours(8)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_token_rejected() {
        let mut store = SessionStore::new(Duration::hours(8));
        store.issue(Uuid::new_v4(), t0());
        assert!(store.validate("not-a-token", t0()).is_none());
    }

    #[test]
    fn revoke_single_token() {
        let mut store = SessionStore::new(Duration::hours(8));
        let issued = store.issue(Uuid::new_v4(), t0());
        assert!(store.revoke(&issued.token));
        assert!(!store.revoke(&issued.token));
        assert!(store.validate(&issued.token, t0()).is_none());
    }

    #[test]
    fn revoke_user_drops_all_their_sessions() {
        let mut store = SessionStore::new(Duration::hours(8));
        let uid = Uuid::new_v4();
        let other = store.issue(Uuid::new_v4(), t0());
        store.issue(uid, t0());
        store.issue(uid, t0());
        assert_eq!(store.revoke_user(&uid), 2);
        assert_eq!(store.len(), 1);
        assert!(store.validate(&other.token, t0()).is_some());
    }

    #[test]
    fn purge_expired_keeps_live_sessions() {
        let mut store = SessionStore::new(Duration::minutes(30));
        store.issue(Uuid::new_v4(), t0());
        let live = store.issue(Uuid::new_v4(), t0() + Duration::minutes(20));
        assert_eq!(store.purge_expired(t0() + Duration::minutes(40)), 1);
        assert!(store.validate(&live.token, t0() + Duration::minutes(40)).is_some());
    }
}

//! Shared application state.
//!
//! One `CoreState` is built at startup and wrapped in `Arc`; every HTTP
//! handler reaches the database, the session store and the login attempt
//! counters through it.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::attempts::{AttemptPolicy, AttemptRegistry};
use crate::config::AppConfig;
use crate::db;
use crate::db::repository::{insert_audit_entry, prune_audit_log, AuditEntry};
use crate::sessions::SessionStore;

/// Audit rows older than this are pruned at startup.
pub const AUDIT_RETENTION_DAYS: i64 = 365;

pub struct CoreState {
    pub config: AppConfig,
    db: Mutex<Connection>,
    sessions: RwLock<SessionStore>,
    attempts: Mutex<AttemptRegistry>,
}

impl CoreState {
    pub fn new(config: AppConfig, conn: Connection) -> Self {
        let policy = AttemptPolicy {
            max_attempts: config.max_login_attempts,
            lockout: Duration::seconds(config.lockout_secs),
            ..AttemptPolicy::default()
        };
        let ttl = Duration::seconds(config.session_ttl_secs);
        Self {
            config,
            db: Mutex::new(conn),
            sessions: RwLock::new(SessionStore::new(ttl)),
            attempts: Mutex::new(AttemptRegistry::new(policy)),
        }
    }

    /// Opens (and migrates) the database file named by the config.
    pub fn open(config: AppConfig) -> Result<Self, CoreError> {
        let conn = db::open_database(&config.database_path)?;
        Ok(Self::new(config, conn))
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_db<T, E>(&self, f: impl FnOnce(&mut Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<CoreError>,
    {
        let mut conn = self.db.lock().map_err(|_| CoreError::LockPoisoned)?;
        f(&mut conn)
    }

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionStore>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionStore>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn attempts(&self) -> Result<MutexGuard<'_, AttemptRegistry>, CoreError> {
        self.attempts.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Records an access event. Failures are logged, never returned.
    pub fn log_access(&self, actor: &str, action: &str, detail: &str) {
        let entry = AuditEntry {
            timestamp: db::format_timestamp(&Utc::now()),
            actor: actor.to_string(),
            action: action.to_string(),
            detail: detail.to_string(),
        };
        let result = self.with_db(|conn| insert_audit_entry(conn, &entry).map_err(CoreError::from));
        if let Err(e) = result {
            tracing::warn!("Failed to write audit entry: {e}");
        }
    }

    pub fn prune_audit(&self) -> Result<usize, CoreError> {
        self.with_db(|conn| Ok(prune_audit_log(conn, AUDIT_RETENTION_DAYS)?))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}

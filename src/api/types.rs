//! Shared types for the clinic API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::core_state::CoreState;
use crate::models::{Role, StaffUser};

pub const REQUESTS_PER_MINUTE: u32 = 120;
pub const REQUESTS_PER_HOUR: u32 = 2000;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Staff context — injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Signed-in staff member, read fresh from the database on every request
/// so role and active-flag changes apply immediately.
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub branch: String,
}

impl StaffContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<StaffUser> for StaffContext {
    fn from(user: StaffUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            branch: user.branch,
        }
    }
}

/// `?mine=true` narrows a listing to rows the caller created. It is a view
/// filter, not an access rule.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MineQuery {
    #[serde(default)]
    pub mine: bool,
}

/// Optional `?today=YYYY-MM-DD` override used by reports.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

// ═══════════════════════════════════════════════════════════
// Rate limiter — per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Sliding-window rate limiter keyed by client (bearer token hash or
/// peer address).
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(REQUESTS_PER_MINUTE, REQUESTS_PER_HOUR)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&mut self, key: &str, now: Instant) -> Result<(), u64> {
        let entries = self.windows.entry(key.to_string()).or_default();

        // Clean entries older than 1 hour
        entries.retain(|ts| now.duration_since(*ts) < Duration::from_secs(3600));

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < Duration::from_secs(60))
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_within_limit() {
        let mut limiter = RateLimiter::new();
        for _ in 0..REQUESTS_PER_MINUTE {
            assert!(limiter.check("client-1").is_ok());
        }
    }

    #[test]
    fn rate_limiter_blocks_over_minute_limit() {
        let mut limiter = RateLimiter::with_limits(5, 100);
        for _ in 0..5 {
            limiter.check("client-1").unwrap();
        }
        assert_eq!(limiter.check("client-1"), Err(60));
    }

    #[test]
    fn rate_limiter_blocks_over_hour_limit() {
        let mut limiter = RateLimiter::with_limits(1000, 10);
        for _ in 0..10 {
            limiter.check("client-1").unwrap();
        }
        assert_eq!(limiter.check("client-1"), Err(3600));
    }

    #[test]
    fn rate_limiter_isolates_clients() {
        let mut limiter = RateLimiter::with_limits(2, 100);
        limiter.check("a").unwrap();
        limiter.check("a").unwrap();
        assert!(limiter.check("a").is_err());
        assert!(limiter.check("b").is_ok());
    }

    #[test]
    fn mine_query_defaults_false() {
        let q: MineQuery = serde_json::from_str("{}").unwrap();
        assert!(!q.mine);
    }

    #[test]
    fn staff_context_from_user() {
        let user = StaffUser {
            uid: Uuid::new_v4(),
            email: "ana@clinica.pe".into(),
            display_name: "Ana".into(),
            role: Role::Admin,
            shift: crate::models::Shift::Morning,
            branch: "Central".into(),
            active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let ctx = StaffContext::from(user);
        assert!(ctx.is_admin());
        assert_eq!(ctx.branch, "Central");
    }
}

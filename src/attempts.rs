//! Login attempt counter with a temporary lockout.
//!
//! Each client key gets a remaining-attempts counter. A failed login
//! decrements it; when it reaches zero a lockout deadline is stored.
//! Checks compare the current time against the deadline and, once it
//! has passed, clear it and restore the full counter. Failures older
//! than the failure window no longer count, and entries in that state
//! are dropped by `AttemptRegistry::purge_stale`.
//!
//! The registry lives in process memory only. It is login friction, not
//! a security boundary: restarting the server forgets every counter.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_LOCKOUT_SECS: i64 = 5 * 60;
pub const DEFAULT_FAILURE_WINDOW_SECS: i64 = 15 * 60;

/// Attempt limit, lockout length and how long an isolated failure counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    pub max_attempts: u32,
    pub lockout: Duration,
    pub failure_window: Duration,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout: Duration::seconds(DEFAULT_LOCKOUT_SECS),
            failure_window: Duration::seconds(DEFAULT_FAILURE_WINDOW_SECS),
        }
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptStatus {
    Allowed { remaining: u32 },
    Blocked { until: DateTime<Utc> },
}

impl AttemptStatus {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Counter state for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempts {
    remaining: u32,
    locked_until: Option<DateTime<Utc>>,
    last_failure: Option<DateTime<Utc>>,
}

impl LoginAttempts {
    pub fn new(policy: &AttemptPolicy) -> Self {
        Self {
            remaining: policy.max_attempts,
            locked_until: None,
            last_failure: None,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.locked_until
    }

    /// Blocked strictly before the deadline. At or after it the lock is
    /// lifted and the counter restored; the same happens to an unlocked
    /// counter whose last failure fell out of the window.
    pub fn check(&mut self, now: DateTime<Utc>, policy: &AttemptPolicy) -> AttemptStatus {
        if let Some(until) = self.locked_until {
            if now < until {
                return AttemptStatus::Blocked { until };
            }
        }
        if self.is_stale(now, policy) {
            self.reset(policy);
        }
        AttemptStatus::Allowed {
            remaining: self.remaining,
        }
    }

    /// True when the counter carries no live state: its lock has expired,
    /// or it is unlocked and its last failure is older than the window.
    pub fn is_stale(&self, now: DateTime<Utc>, policy: &AttemptPolicy) -> bool {
        match (self.locked_until, self.last_failure) {
            (Some(until), _) => now >= until,
            (None, Some(last)) => now - last >= policy.failure_window,
            (None, None) => true,
        }
    }

    /// Records a failed login. Returns the status after the failure.
    pub fn record_failure(&mut self, now: DateTime<Utc>, policy: &AttemptPolicy) -> AttemptStatus {
        if let AttemptStatus::Blocked { until } = self.check(now, policy) {
            return AttemptStatus::Blocked { until };
        }
        self.remaining = self.remaining.saturating_sub(1);
        self.last_failure = Some(now);
        if self.remaining == 0 {
            let until = now + policy.lockout;
            self.locked_until = Some(until);
            return AttemptStatus::Blocked { until };
        }
        AttemptStatus::Allowed {
            remaining: self.remaining,
        }
    }

    pub fn reset(&mut self, policy: &AttemptPolicy) {
        self.remaining = policy.max_attempts;
        self.locked_until = None;
        self.last_failure = None;
    }
}

/// Independent counters keyed by client (peer address plus normalized
/// login e-mail).
#[derive(Debug, Default)]
pub struct AttemptRegistry {
    policy: AttemptPolicy,
    entries: HashMap<String, LoginAttempts>,
}

impl AttemptRegistry {
    pub fn new(policy: AttemptPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &AttemptPolicy {
        &self.policy
    }

    pub fn check(&mut self, key: &str, now: DateTime<Utc>) -> AttemptStatus {
        let policy = self.policy;
        match self.entries.get_mut(key) {
            Some(entry) => {
                let status = entry.check(now, &policy);
                if entry.remaining() == policy.max_attempts && entry.locked_until().is_none() {
                    self.entries.remove(key);
                }
                status
            }
            None => AttemptStatus::Allowed {
                remaining: policy.max_attempts,
            },
        }
    }

    pub fn record_failure(&mut self, key: &str, now: DateTime<Utc>) -> AttemptStatus {
        let policy = self.policy;
        let status = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| LoginAttempts::new(&policy))
            .record_failure(now, &policy);
        if let AttemptStatus::Blocked { until } = status {
            tracing::warn!(key, %until, "login locked out");
        }
        status
    }

    pub fn record_success(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Drops every counter with no live state. Returns how many went.
    pub fn purge_stale(&mut self, now: DateTime<Utc>) -> usize {
        let policy = self.policy;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale(now, &policy));
        let purged = before - self.entries.len();
        if purged > 0 {
            tracing::debug!(purged, "stale login counters dropped");
        }
        purged
    }

    /// Number of clients with a live counter.
    pub fn tracked(&self) -> usize {
        self.entries.len()
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
    fn fresh_counter_allows_full_attempts() {
        let policy = AttemptPolicy::default();
        let mut attempts = LoginAttempts::new(&policy);
        assert_eq!(attempts.check(t0(), &policy), AttemptStatus::Allowed { remaining: 3 });
    }

    #[test]
    fn third_failure_sets_deadline_five_minutes_after_it() {
        let policy = AttemptPolicy::default();
        let mut attempts = LoginAttempts::new(&policy);
        let third = t0() + Duration::seconds(40);

        assert_eq!(
            attempts.record_failure(t0(), &policy),
            AttemptStatus::Allowed { remaining: 2 }
        );
        assert_eq!(
            attempts.record_failure(t0() + Duration::seconds(20), &policy),
            AttemptStatus::Allowed { remaining: 1 }
        );
        let status = attempts.record_failure(third, &policy);
        assert_eq!(status, AttemptStatus::Blocked { until: third + Duration::minutes(5) });
        assert_eq!(attempts.locked_until(), Some(third + Duration::minutes(5)));
    }

    #[test]
    fn blocked_before_deadline_unblocked_at_deadline() {
        let policy = AttemptPolicy::default();
        let mut attempts = LoginAttempts::new(&policy);
        for _ in 0..3 {
            attempts.record_failure(t0(), &policy);
        }
        let deadline = t0() + Duration::minutes(5);

        assert!(attempts.check(deadline - Duration::seconds(1), &policy).is_blocked());
        assert_eq!(
            attempts.check(deadline, &policy),
            AttemptStatus::Allowed { remaining: 3 }
        );
        assert_eq!(attempts.remaining(), 3);
        assert!(attempts.locked_until().is_none());
    }

    #[test]
    fn failures_while_blocked_do_not_extend_deadline() {
        let policy = AttemptPolicy::default();
        let mut attempts = LoginAttempts::new(&policy);
        for _ in 0..3 {
            attempts.record_failure(t0(), &policy);
        }
        let status = attempts.record_failure(t0() + Duration::minutes(2), &policy);
        assert_eq!(status, AttemptStatus::Blocked { until: t0() + Duration::minutes(5) });
    }

    #[test]
    fn counter_restarts_after_lockout_expires() {
        let policy = AttemptPolicy::default();
        let mut attempts = LoginAttempts::new(&policy);
        for _ in 0..3 {
            attempts.record_failure(t0(), &policy);
        }
        let later = t0() + Duration::minutes(6);
        assert_eq!(
            attempts.record_failure(later, &policy),
            AttemptStatus::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn custom_policy() {
        let policy = AttemptPolicy {
            max_attempts: 1,
            lockout: Duration::seconds(30),
            ..AttemptPolicy::default()
        };
        let mut attempts = LoginAttempts::new(&policy);
        assert_eq!(
            attempts.record_failure(t0(), &policy),
            AttemptStatus::Blocked { until: t0() + Duration::seconds(30) }
        );
    }

    #[test]
    fn registry_isolates_keys() {
        let mut registry = AttemptRegistry::new(AttemptPolicy::default());
        for _ in 0..3 {
            registry.record_failure("ana@clinica.pe", t0());
        }
        assert!(registry.check("ana@clinica.pe", t0()).is_blocked());
        assert_eq!(
            registry.check("rosa@clinica.pe", t0()),
            AttemptStatus::Allowed { remaining: 3 }
        );
    }

    #[test]
    fn registry_success_clears_counter() {
        let mut registry = AttemptRegistry::new(AttemptPolicy::default());
        registry.record_failure("ana@clinica.pe", t0());
        registry.record_failure("ana@clinica.pe", t0());
        registry.record_success("ana@clinica.pe");
        assert_eq!(registry.tracked(), 0);
        assert_eq!(
            registry.check("ana@clinica.pe", t0()),
            AttemptStatus::Allowed { remaining: 3 }
        );
    }

    #[test]
    fn registry_drops_expired_lockouts() {
        let mut registry = AttemptRegistry::new(AttemptPolicy::default());
        for _ in 0..3 {
            registry.record_failure("ana@clinica.pe", t0());
        }
        assert_eq!(registry.tracked(), 1);
        registry.check("ana@clinica.pe", t0() + Duration::minutes(5));
        assert_eq!(registry.tracked(), 0);
    }

    #[test]
    fn isolated_failure_expires_after_window() {
        let policy = AttemptPolicy::default();
        let mut attempts = LoginAttempts::new(&policy);
        attempts.record_failure(t0(), &policy);
        attempts.record_failure(t0() + Duration::minutes(1), &policy);

        let inside = t0() + Duration::minutes(15);
        assert_eq!(attempts.check(inside, &policy), AttemptStatus::Allowed { remaining: 1 });
        let outside = t0() + Duration::minutes(16);
        assert!(attempts.is_stale(outside, &policy));
        assert_eq!(attempts.check(outside, &policy), AttemptStatus::Allowed { remaining: 3 });
        assert_eq!(
            attempts.record_failure(outside, &policy),
            AttemptStatus::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn purge_stale_evicts_single_failure_keys() {
        let mut registry = AttemptRegistry::new(AttemptPolicy::default());
        for i in 0..10_000 {
            registry.record_failure(&format!("10.0.0.1/user{i}@clinica.pe"), t0());
        }
        assert_eq!(registry.tracked(), 10_000);

        assert_eq!(registry.purge_stale(t0() + Duration::minutes(5)), 0);
        assert_eq!(registry.purge_stale(t0() + Duration::minutes(15)), 10_000);
        assert_eq!(registry.tracked(), 0);
    }

    #[test]
    fn purge_stale_keeps_active_lockouts() {
        let mut registry = AttemptRegistry::new(AttemptPolicy::default());
        for _ in 0..3 {
            registry.record_failure("locked", t0());
        }
        registry.record_failure("recent", t0() + Duration::minutes(4));
        registry.record_failure("old", t0() - Duration::minutes(20));

        assert_eq!(registry.purge_stale(t0() + Duration::minutes(4)), 1);
        assert_eq!(registry.tracked(), 2);
        assert!(registry.check("locked", t0() + Duration::minutes(4)).is_blocked());

        assert_eq!(registry.purge_stale(t0() + Duration::minutes(5)), 1);
        assert_eq!(registry.tracked(), 1);
    }

    #[test]
    fn concurrent_checks_cannot_exceed_limit() {
        // Five requests pass the check before any of them records a failure.
        let mut registry = AttemptRegistry::new(AttemptPolicy::default());
        let key = "10.0.0.1/ana@clinica.pe";
        for _ in 0..5 {
            assert_eq!(registry.check(key, t0()), AttemptStatus::Allowed { remaining: 3 });
        }

        let until = t0() + Duration::seconds(2) + Duration::minutes(5);
        let outcomes: Vec<_> = (0..5)
            .map(|i| registry.record_failure(key, t0() + Duration::seconds(i)))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                AttemptStatus::Allowed { remaining: 2 },
                AttemptStatus::Allowed { remaining: 1 },
                AttemptStatus::Blocked { until },
                AttemptStatus::Blocked { until },
                AttemptStatus::Blocked { until },
            ]
        );
        assert!(registry.check(key, t0() + Duration::minutes(3)).is_blocked());
    }
}

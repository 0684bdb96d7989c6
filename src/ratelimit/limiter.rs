//! Core fixed-window rate limiter.

use dashmap::DashMap;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::quota::Quota;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the operation may proceed
    pub allowed: bool,
    /// Quota left in the current window after this check
    pub remaining: u32,
    /// Epoch milliseconds at which the window this check was evaluated
    /// against ends
    pub reset_at: i64,
    /// Whole seconds until `reset_at`, rounded up; present only on rejection
    pub retry_after: Option<u64>,
}

/// Counter state for one identifier's current window.
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    /// Admitted operations in the current window; never 0 for a stored entry
    count: u32,
    /// Epoch milliseconds at which the window ends
    reset_at: i64,
}

/// Fixed-window rate limiter over an in-process store.
///
/// Entries are created lazily per identifier and keep counting until the
/// window ends; a check after `reset_at` starts a fresh window. The store is
/// a sharded map, so the read-check-increment sequence for one identifier is
/// atomic with respect to concurrent checks and the background sweep.
///
/// Quotas apply per identifier within this process only. Running multiple
/// instances yields independent quotas per instance.
pub struct RateLimiter<C: Clock = SystemClock> {
    /// Window counters indexed by throttling identifier
    entries: DashMap<String, WindowEntry>,
    /// Time source for window arithmetic
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Create a new rate limiter on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a new rate limiter with the given clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Decide whether one operation under `identifier` is admitted.
    ///
    /// The first check of a window always admits, regardless of the quota
    /// value. A rejected check does not consume quota: repeating it within
    /// the same window keeps returning the same decision.
    pub fn check(&self, identifier: &str, quota: &Quota) -> RateLimitDecision {
        let now = self.clock.now_ms();

        trace!(identifier, max_requests = quota.max_requests, "Checking rate limit");

        let mut entry = self
            .entries
            .entry(identifier.to_string())
            .or_insert(WindowEntry {
                count: 0,
                reset_at: 0,
            });

        // Fresh identifier, or the previous window has ended: start a new
        // window with this operation as its first admission. The sentinel
        // inserted above has count 0 and takes this branch.
        if entry.count == 0 || now > entry.reset_at {
            *entry = WindowEntry {
                count: 1,
                reset_at: now + quota.window_ms as i64,
            };
            return RateLimitDecision {
                allowed: true,
                remaining: quota.max_requests.saturating_sub(1),
                reset_at: entry.reset_at,
                retry_after: None,
            };
        }

        // Window still live and quota exhausted: reject without mutating.
        // `remaining` is reported as 0 even though count == max_requests.
        if entry.count >= quota.max_requests {
            debug!(
                identifier,
                count = entry.count,
                max_requests = quota.max_requests,
                "Rate limit exceeded"
            );
            let retry_after = ((entry.reset_at - now) as u64).div_ceil(1000);
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: entry.reset_at,
                retry_after: Some(retry_after),
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: quota.max_requests - entry.count,
            reset_at: entry.reset_at,
            retry_after: None,
        }
    }

    /// Remove entries whose window has ended.
    ///
    /// Returns the number of entries reclaimed. Correctness does not depend
    /// on this running: `check` treats expired entries as absent. It only
    /// bounds the store to currently-or-recently-active identifiers.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.reset_at);
        before.saturating_sub(self.entries.len())
    }

    /// Current count for an identifier, if a window entry exists.
    pub fn current_count(&self, identifier: &str) -> Option<u32> {
        self.entries.get(identifier).map(|entry| entry.count)
    }

    /// Number of identifiers with a stored window entry.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Drop all window entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;

    const START_MS: i64 = 1_700_000_000_000;

    fn limiter() -> (RateLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::starting_at(START_MS);
        (RateLimiter::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_first_check_admits() {
        let (limiter, _clock) = limiter();
        let quota = Quota::new(10, 60_000);

        let decision = limiter.check("inference:a@example.com", &quota);

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
        assert_eq!(decision.reset_at, START_MS + 60_000);
        assert_eq!(decision.retry_after, None);
    }

    #[test]
    fn test_first_check_admits_even_with_quota_of_one() {
        let (limiter, _clock) = limiter();
        let quota = Quota::new(1, 60_000);

        let decision = limiter.check("key", &quota);

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_remaining_decreases_monotonically() {
        let (limiter, _clock) = limiter();
        let quota = Quota::new(5, 60_000);

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check("key", &quota);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.reset_at, START_MS + 60_000);
        }
    }

    #[test]
    fn test_exhausted_window_rejects() {
        let (limiter, _clock) = limiter();
        let quota = Quota::new(5, 60_000);

        for _ in 0..5 {
            assert!(limiter.check("key", &quota).allowed);
        }

        let decision = limiter.check("key", &quota);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_at, START_MS + 60_000);
        // Clock has not moved, so the full window remains
        assert_eq!(decision.retry_after, Some(60));
    }

    #[test]
    fn test_retry_after_rounds_up_partial_seconds() {
        let (limiter, clock) = limiter();
        let quota = Quota::new(1, 60_000);

        limiter.check("key", &quota);
        clock.advance_ms(59_500);

        let decision = limiter.check("key", &quota);
        assert!(!decision.allowed);
        // 500ms left rounds up to a full second
        assert_eq!(decision.retry_after, Some(1));
    }

    #[test]
    fn test_rejection_does_not_consume_quota() {
        let (limiter, _clock) = limiter();
        let quota = Quota::new(2, 60_000);

        limiter.check("key", &quota);
        limiter.check("key", &quota);
        assert_eq!(limiter.current_count("key"), Some(2));

        for _ in 0..3 {
            let decision = limiter.check("key", &quota);
            assert!(!decision.allowed);
            assert_eq!(decision.remaining, 0);
        }
        assert_eq!(limiter.current_count("key"), Some(2));
    }

    #[test]
    fn test_window_rollover_resets_quota() {
        let (limiter, clock) = limiter();
        let quota = Quota::new(2, 60_000);

        limiter.check("key", &quota);
        limiter.check("key", &quota);
        assert!(!limiter.check("key", &quota).allowed);

        // Strictly past the window end
        clock.advance_ms(60_001);

        let decision = limiter.check("key", &quota);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.reset_at, START_MS + 60_001 + 60_000);
        assert_eq!(limiter.current_count("key"), Some(1));
    }

    #[test]
    fn test_check_exactly_at_reset_time_stays_in_old_window() {
        let (limiter, clock) = limiter();
        let quota = Quota::new(1, 60_000);

        limiter.check("key", &quota);
        clock.advance_ms(60_000);

        // Expiry requires now strictly greater than reset_at
        let decision = limiter.check("key", &quota);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after, Some(0));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (limiter, _clock) = limiter();
        let quota = Quota::new(1, 60_000);

        assert!(limiter.check("inference:a@example.com", &quota).allowed);
        assert!(!limiter.check("inference:a@example.com", &quota).allowed);

        // Other identifiers under the same quota are unaffected
        assert!(limiter.check("inference:b@example.com", &quota).allowed);
        assert_eq!(limiter.current_count("inference:b@example.com"), Some(1));
    }

    #[test]
    fn test_sweep_keeps_live_entries() {
        let (limiter, _clock) = limiter();
        let quota = Quota::new(5, 60_000);

        limiter.check("key", &quota);
        let removed = limiter.sweep();

        assert_eq!(removed, 0);
        assert_eq!(limiter.entry_count(), 1);
        // Subsequent check continues the same window rather than resetting
        let decision = limiter.check("key", &quota);
        assert_eq!(decision.remaining, 3);
        assert_eq!(limiter.current_count("key"), Some(2));
    }

    #[test]
    fn test_sweep_removes_expired_entries() {
        let (limiter, clock) = limiter();
        let quota = Quota::new(5, 60_000);

        limiter.check("old", &quota);
        clock.advance_ms(60_001);
        limiter.check("fresh", &quota);

        let removed = limiter.sweep();

        assert_eq!(removed, 1);
        assert_eq!(limiter.entry_count(), 1);
        assert_eq!(limiter.current_count("old"), None);
        assert_eq!(limiter.current_count("fresh"), Some(1));
    }

    #[test]
    fn test_sweep_keeps_entry_exactly_at_reset_time() {
        let (limiter, clock) = limiter();
        let quota = Quota::new(5, 60_000);

        limiter.check("key", &quota);
        clock.advance_ms(60_000);

        assert_eq!(limiter.sweep(), 0);
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn test_check_after_sweep_starts_fresh_window() {
        let (limiter, clock) = limiter();
        let quota = Quota::new(2, 60_000);

        limiter.check("key", &quota);
        clock.advance_ms(60_001);
        limiter.sweep();
        assert_eq!(limiter.entry_count(), 0);

        let decision = limiter.check("key", &quota);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.reset_at, START_MS + 60_001 + 60_000);
    }

    #[test]
    fn test_demo_scenario() {
        let (limiter, clock) = limiter();
        let quota = Quota::new(2, 1_000);

        let first = limiter.check("demo", &quota);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);

        let second = limiter.check("demo", &quota);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = limiter.check("demo", &quota);
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.retry_after, Some(1));

        clock.advance_ms(1_001);

        let fourth = limiter.check("demo", &quota);
        assert!(fourth.allowed);
        assert_eq!(fourth.remaining, 1);
    }

    #[test]
    fn test_clear_drops_all_entries() {
        let (limiter, _clock) = limiter();
        let quota = Quota::new(5, 60_000);

        limiter.check("a", &quota);
        limiter.check("b", &quota);
        assert_eq!(limiter.entry_count(), 2);

        limiter.clear();
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_concurrent_checks_admit_exactly_quota() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new());
        let quota = Quota::new(50, 60_000);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    let mut admitted = 0u32;
                    for _ in 0..20 {
                        if limiter.check("shared", &quota).allowed {
                            admitted += 1;
                        }
                    }
                    admitted
                })
            })
            .collect();

        let admitted: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // 160 attempts against a quota of 50 within one window
        assert_eq!(admitted, 50);
        assert_eq!(limiter.current_count("shared"), Some(50));
    }
}

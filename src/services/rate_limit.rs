//! Per-session fixed-window rate limiting for AI questions.
//!
//! Each visitor session owns one `(request_count, window_start)` pair behind its own
//! mutex. The map only hands out the per-session slot, so sessions never wait on each
//! other's counters, and the slot lock is released before the caller talks to the model.
//!
//! The window is fixed, not sliding: a visitor can spend the full quota at the end of
//! one window and again right after the reset.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default maximum questions per window.
const DEFAULT_MAX_REQUESTS: u32 = 20;

/// Default window length (5 minutes).
const DEFAULT_WINDOW_SECS: u64 = 300;

/// Session count at which the first sweep of expired idle entries runs.
///
/// After each sweep the next one is scheduled at twice the surviving count, so a map
/// full of live sessions is scanned a logarithmic number of times as it grows.
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum accepted requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
        }
    }
}

impl RateLimitConfig {
    /// Sets maximum requests per window.
    #[must_use]
    pub const fn with_max_requests(mut self, max: u32) -> Self {
        self.max_requests = max;
        self
    }

    /// Sets window duration in seconds.
    #[must_use]
    pub const fn with_window_secs(mut self, secs: u64) -> Self {
        self.window = Duration::from_secs(secs);
        self
    }
}

/// Counter state for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRateState {
    /// Accepted requests in the current window.
    pub request_count: u32,
    /// Start of the current window.
    pub window_start: Instant,
}

impl SessionRateState {
    const fn new(now: Instant) -> Self {
        Self {
            request_count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The request was counted.
    Allowed {
        /// Requests left in the current window.
        remaining: u32,
    },
    /// The quota is exhausted; nothing was counted.
    Rejected {
        /// Time until the current window ends.
        retry_after: Duration,
    },
}

impl RateDecision {
    /// Returns true if the request was allowed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Keyed store of per-session counters.
///
/// There is no hard cap on tracked sessions: evicting a live entry would hand its
/// owner a fresh quota. Memory is bounded by the sweep schedule at roughly twice the
/// number of sessions active within one window.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    sessions: DashMap<String, Arc<Mutex<SessionRateState>>>,
    prune_threshold: usize,
    next_prune_at: AtomicUsize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiter {
    /// Creates a rate limiter.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            prune_threshold: PRUNE_THRESHOLD,
            next_prune_at: AtomicUsize::new(PRUNE_THRESHOLD),
        }
    }

    /// Sets the session count at which the first sweep runs.
    #[must_use]
    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        self.prune_threshold = threshold;
        self.next_prune_at = AtomicUsize::new(threshold);
        self
    }

    /// Returns the session count at which the next sweep runs.
    #[must_use]
    pub fn next_prune_at(&self) -> usize {
        self.next_prune_at.load(Ordering::Acquire)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Checks the quota for a session and counts the request if allowed.
    pub fn check_and_increment(&self, session: &str) -> RateDecision {
        self.check_and_increment_at(session, Instant::now())
    }

    /// Check and increment with an explicit timestamp.
    ///
    /// Timestamps for one session must be non-decreasing for the reset logic to hold.
    pub fn check_and_increment_at(&self, session: &str, now: Instant) -> RateDecision {
        let slot = self.slot(session, now);
        let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if state.is_expired(now, self.config.window) {
            *state = SessionRateState::new(now);
        }

        if state.request_count >= self.config.max_requests {
            let elapsed = now.saturating_duration_since(state.window_start);
            let retry_after = self.config.window.saturating_sub(elapsed);
            tracing::warn!(
                requests = state.request_count,
                max_requests = self.config.max_requests,
                retry_after_secs = retry_after.as_secs(),
                "Per-session rate limit exceeded"
            );
            return RateDecision::Rejected { retry_after };
        }

        state.request_count += 1;
        let remaining = self.config.max_requests - state.request_count;
        drop(state);

        tracing::debug!(remaining, "Rate limit OK");
        RateDecision::Allowed { remaining }
    }

    /// Returns a snapshot of a session's counter, if one exists.
    #[must_use]
    pub fn session_state(&self, session: &str) -> Option<SessionRateState> {
        let slot = self.sessions.get(session).map(|entry| Arc::clone(entry.value()))?;
        let state = *slot.lock().unwrap_or_else(PoisonError::into_inner);
        Some(state)
    }

    /// Returns the number of tracked sessions.
    #[must_use]
    pub fn tracked_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Removes sessions whose window has expired and that no request currently holds.
    ///
    /// Dropping an expired entry is equivalent to the reset the next request would do.
    pub fn prune_expired(&self, now: Instant) {
        let window = self.config.window;
        self.sessions.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            slot.try_lock()
                .map_or(true, |state| !state.is_expired(now, window))
        });
    }

    fn slot(&self, session: &str, now: Instant) -> Arc<Mutex<SessionRateState>> {
        if let Some(entry) = self.sessions.get(session) {
            return Arc::clone(entry.value());
        }

        self.maybe_prune(now);

        let entry = self
            .sessions
            .entry(session.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionRateState::new(now))));
        Arc::clone(entry.value())
    }

    /// Sweeps once the map reaches the scheduled size, then reschedules.
    ///
    /// Only the request that claims the schedule sweeps; concurrent inserts see
    /// `usize::MAX` and skip.
    fn maybe_prune(&self, now: Instant) {
        let scheduled = self.next_prune_at.load(Ordering::Acquire);
        if self.sessions.len() < scheduled {
            return;
        }
        if self
            .next_prune_at
            .compare_exchange(scheduled, usize::MAX, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let before = self.sessions.len();
        self.prune_expired(now);
        let remaining = self.sessions.len();
        let next = remaining.saturating_mul(2).max(self.prune_threshold);
        self.next_prune_at.store(next, Ordering::Release);

        tracing::debug!(
            removed = before.saturating_sub(remaining),
            remaining,
            next_prune_at = next,
            "Pruned rate limit sessions"
        );
    }
}

// Fixed-window rate limiting.
//
// Two independent instances guard the process: the API limiter keyed by user
// id (long window, identities are long-lived and low-cardinality, entries may
// outlive their window) and the streaming limiter keyed by connection id
// (short window, tuned for cursor traffic; entries must be cleared on close
// to bound memory under connection churn).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use driftboard_core::constants::{
    API_RATE_LIMIT_MAX_REQUESTS, API_RATE_LIMIT_WINDOW, WS_RATE_LIMIT_MAX_MESSAGES,
    WS_RATE_LIMIT_WINDOW,
};

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u32,
    reset_at: Instant,
}

pub struct FixedWindowLimiter {
    window: Duration,
    max: u32,
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// API limiter: keyed by authenticated user id
    pub fn api() -> Self {
        Self::new(API_RATE_LIMIT_WINDOW, API_RATE_LIMIT_MAX_REQUESTS)
    }

    /// Streaming limiter: keyed by connection id, one user may hold many
    pub fn streaming() -> Self {
        Self::new(WS_RATE_LIMIT_WINDOW, WS_RATE_LIMIT_MAX_MESSAGES)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count a call against `key`. Returns `true` if allowed. The first call
    /// in a window starts it; a call past the deadline restarts it.
    pub fn check(&self, key: Uuid) -> bool {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get_mut(&key) {
            None => {
                entries.insert(
                    key,
                    Entry {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                true
            }
            Some(entry) if now > entry.reset_at => {
                entry.count = 1;
                entry.reset_at = now + self.window;
                true
            }
            Some(entry) => {
                entry.count += 1;
                entry.count <= self.max
            }
        }
    }

    /// Seconds until the key's window resets, for `Retry-After` hints
    pub fn retry_after_secs(&self, key: Uuid) -> u64 {
        let entries = self.lock();
        let Some(entry) = entries.get(&key) else {
            return 0;
        };
        let remaining = entry.reset_at.saturating_duration_since(Instant::now());
        remaining.as_secs_f64().ceil() as u64
    }

    /// Drop a key's state; called when its connection closes
    pub fn clear(&self, key: Uuid) {
        self.lock().remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_plus_one_is_denied() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 3);
        let key = Uuid::now_v7();

        assert!(limiter.check(key));
        assert!(limiter.check(key));
        assert!(limiter.check(key));
        assert!(!limiter.check(key));
    }

    #[test]
    fn test_window_resets_after_deadline() {
        let limiter = FixedWindowLimiter::new(Duration::from_millis(20), 1);
        let key = Uuid::now_v7();

        assert!(limiter.check(key));
        assert!(!limiter.check(key));

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(key));
        assert!(!limiter.check(key));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 1);
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        assert!(limiter.check(a));
        assert!(!limiter.check(a));
        assert!(limiter.check(b));
    }

    #[test]
    fn test_retry_after_reports_remaining_window() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 1);
        let key = Uuid::now_v7();

        assert_eq!(limiter.retry_after_secs(key), 0);
        limiter.check(key);
        let retry_after = limiter.retry_after_secs(key);
        assert!(retry_after >= 59 && retry_after <= 60);
    }

    #[test]
    fn test_clear_forgets_the_key() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 1);
        let key = Uuid::now_v7();

        limiter.check(key);
        assert!(!limiter.check(key));

        limiter.clear(key);
        assert!(limiter.check(key));
    }
}

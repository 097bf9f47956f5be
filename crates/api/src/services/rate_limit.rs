use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Counter storage behind the fixed-window limiters.
///
/// Injected into [`FixedWindowLimiter`] so a single-instance deployment
/// runs on the in-memory table while a multi-instance one plugs in a
/// shared cache with atomic counters. Keys are namespaced by the caller
/// (`{domain}:login:{email}:{ip}`, `{domain}:verify:{ip}`) so windows
/// never collide.
pub trait RateLimitStore: Send + Sync {
    /// Record a hit on `key` under a fixed window of `window_secs` seconds.
    /// Returns `Err(retry_after_secs)` when the key is at `max_attempts`
    /// for the current window; denial does not count as a hit.
    fn try_consume(&self, key: &str, max_attempts: u32, window_secs: i64) -> Result<(), i64>;

    /// Clear the window for `key`.
    fn reset(&self, key: &str);

    /// Remove windows whose reset time has passed. Returns the number
    /// removed.
    fn sweep_expired(&self, now: DateTime<Utc>) -> usize;
}

/// In-memory [`RateLimitStore`] for single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    entries: RwLock<HashMap<String, WindowEntry>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn try_consume(&self, key: &str, max_attempts: u32, window_secs: i64) -> Result<(), i64> {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap();

        let entry = entries
            .entry(key.to_string())
            .and_modify(|e| {
                if e.reset_at <= now {
                    e.count = 0;
                    e.reset_at = now + Duration::seconds(window_secs);
                }
            })
            .or_insert_with(|| WindowEntry {
                count: 0,
                reset_at: now + Duration::seconds(window_secs),
            });

        if entry.count >= max_attempts {
            let retry_after = (entry.reset_at - now).num_seconds().max(1);
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(())
    }

    fn reset(&self, key: &str) {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_at > now);
        before - entries.len()
    }
}

/// Fixed-window rate limiter bound to one policy.
///
/// The first hit on a key opens a window of `window_secs`; every hit inside
/// the window counts against `max_attempts`. When the window lapses the next
/// hit opens a fresh one. Counting is deliberately unconditional: a rejected
/// password still consumes an attempt.
#[derive(Clone)]
pub struct FixedWindowLimiter {
    store: Arc<dyn RateLimitStore>,
    max_attempts: u32,
    window_secs: i64,
}

impl FixedWindowLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, max_attempts: u32, window_secs: i64) -> Self {
        Self {
            store,
            max_attempts,
            window_secs,
        }
    }

    /// Record a hit on `key`. Returns `Err(retry_after_secs)` when the key
    /// is over its limit for the current window.
    pub fn hit(&self, key: &str) -> Result<(), i64> {
        self.store
            .try_consume(key, self.max_attempts, self.window_secs)
    }

    /// Clear the window for `key`, typically after a successful login.
    pub fn reset(&self, key: &str) {
        self.store.reset(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32, window_secs: i64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            max_attempts,
            window_secs,
        )
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = limiter(3, 900);
        assert!(limiter.hit("login:a@example.com:1.2.3.4").is_ok());
        assert!(limiter.hit("login:a@example.com:1.2.3.4").is_ok());
        assert!(limiter.hit("login:a@example.com:1.2.3.4").is_ok());
        let retry = limiter.hit("login:a@example.com:1.2.3.4").unwrap_err();
        assert!(retry > 0 && retry <= 900);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, 900);
        assert!(limiter.hit("login:a@example.com:1.2.3.4").is_ok());
        assert!(limiter.hit("login:b@example.com:1.2.3.4").is_ok());
        assert!(limiter.hit("login:a@example.com:5.6.7.8").is_ok());
        assert!(limiter.hit("login:a@example.com:1.2.3.4").is_err());
    }

    #[test]
    fn test_reset_clears_window() {
        let limiter = limiter(1, 900);
        assert!(limiter.hit("verify:1.2.3.4").is_ok());
        assert!(limiter.hit("verify:1.2.3.4").is_err());
        limiter.reset("verify:1.2.3.4");
        assert!(limiter.hit("verify:1.2.3.4").is_ok());
    }

    #[test]
    fn test_lapsed_window_reopens() {
        let limiter = limiter(1, -1);
        assert!(limiter.hit("verify:1.2.3.4").is_ok());
        // Window already lapsed, so the next hit opens a fresh one
        assert!(limiter.hit("verify:1.2.3.4").is_ok());
    }

    #[test]
    fn test_sweep_expired() {
        let store = Arc::new(InMemoryRateLimitStore::new());
        let lapsed = FixedWindowLimiter::new(store.clone(), 5, -1);
        let live = FixedWindowLimiter::new(store.clone(), 5, 900);
        lapsed.hit("old").unwrap();
        live.hit("new").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.sweep_expired(Utc::now()), 1);
        assert_eq!(store.len(), 1);
    }
}

//! Abuse limiter and event dedupe.
//!
//! Cheap, approximate protection in front of the event sink and the
//! subscribe endpoint. Each `(purpose, identity)` key holds a
//! `{count, reset_at}` window counter; a request may be subject to
//! several windows at once (per-IP burst, per-IP sustained,
//! per-identity-and-type) and must pass all of them.
//!
//! # Known limitation
//!
//! The bundled store is an in-process map: counters neither survive a
//! restart nor span multiple instances, so its guarantees are
//! best-effort abuse deterrence, not correctness. [`RateStore`] is the
//! seam for a durable external key-value store where a deployment needs
//! one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Denied; the caller should retry after this many seconds.
    Limited { retry_after_secs: u64 },
}

impl Decision {
    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// One rate window applied to a key.
#[derive(Debug, Clone, Copy)]
pub struct WindowRule {
    /// Maximum hits inside one window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
}

/// Counter and dedupe storage.
///
/// Implementations must be safe for concurrent callers; the in-process
/// implementation serializes through a mutex.
pub trait RateStore: Send + Sync {
    /// Register a hit against `key` and decide whether it passes.
    fn hit(&self, key: &str, rule: WindowRule) -> Decision;

    /// Set-if-absent with expiry. Returns `true` the first time `key` is
    /// seen inside `ttl`, `false` for every repeat.
    fn set_if_absent(&self, key: &str, ttl: Duration) -> bool;
}

/// A `{count, reset_at}` window counter.
#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u32,
    reset_at: Instant,
}

/// In-process [`RateStore`] backed by mutex-guarded maps.
///
/// Stale entries are evicted opportunistically once a map grows past
/// `max_entries`; there is no background sweeper.
pub struct MemoryRateStore {
    counters: Mutex<HashMap<String, Counter>>,
    seen: Mutex<HashMap<String, Instant>>,
    max_entries: usize,
}

impl MemoryRateStore {
    /// Default map size that triggers opportunistic eviction.
    const DEFAULT_MAX_ENTRIES: usize = 10_000;

    /// Create a store with the default eviction threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    /// Create a store with a custom eviction threshold.
    #[must_use]
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            seen: Mutex::new(HashMap::new()),
            max_entries,
        }
    }
}

impl Default for MemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RateStore for MemoryRateStore {
    fn hit(&self, key: &str, rule: WindowRule) -> Decision {
        let now = Instant::now();
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());

        if counters.len() > self.max_entries {
            counters.retain(|_, c| c.reset_at > now);
        }

        let counter = counters.entry(key.to_owned()).or_insert(Counter {
            count: 0,
            reset_at: now + rule.window,
        });

        if now > counter.reset_at {
            counter.count = 0;
            counter.reset_at = now + rule.window;
        }

        counter.count += 1;
        if counter.count > rule.limit {
            let retry_after_secs = counter
                .reset_at
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Decision::Limited { retry_after_secs };
        }

        Decision::Allowed
    }

    fn set_if_absent(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());

        if seen.len() > self.max_entries {
            seen.retain(|_, expires| *expires > now);
        }

        match seen.get(key) {
            Some(expires) if *expires > now => false,
            _ => {
                seen.insert(key.to_owned(), now + ttl);
                true
            }
        }
    }
}

/// The limiter handed to request handlers.
///
/// Wraps a [`RateStore`] with the multi-window check and a global enable
/// switch (disabled limiters allow everything, for tests and local dev).
pub struct RateLimiter {
    store: Box<dyn RateStore>,
    enabled: bool,
}

impl RateLimiter {
    /// Create a limiter over the given store.
    #[must_use]
    pub fn new(store: Box<dyn RateStore>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// In-process limiter with default settings.
    #[must_use]
    pub fn in_process(enabled: bool) -> Self {
        Self::new(Box::new(MemoryRateStore::new()), enabled)
    }

    /// Apply every `(key, rule)` pair; all must pass.
    ///
    /// Returns the first denial encountered. Keys are
    /// `"{purpose}:{identity}"` strings built by the caller.
    pub fn check_all(&self, checks: &[(String, WindowRule)]) -> Decision {
        if !self.enabled {
            return Decision::Allowed;
        }
        for (key, rule) in checks {
            let decision = self.store.hit(key, *rule);
            if !decision.is_allowed() {
                return decision;
            }
        }
        Decision::Allowed
    }

    /// Collapse repeated identical low-value hits within `ttl`.
    ///
    /// Returns `true` when this hit is the first and should be
    /// persisted; repeats are accepted silently but not stored.
    pub fn dedupe_once(&self, key: &str, ttl: Duration) -> bool {
        if !self.enabled {
            return true;
        }
        self.store.set_if_absent(key, ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(limit: u32, secs: u64) -> WindowRule {
        WindowRule {
            limit,
            window: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_allows_within_limit() {
        let store = MemoryRateStore::new();
        for _ in 0..5 {
            assert_eq!(store.hit("ip:1.2.3.4", rule(5, 60)), Decision::Allowed);
        }
    }

    #[test]
    fn test_blocks_over_limit_with_retry_hint() {
        let store = MemoryRateStore::new();
        for _ in 0..3 {
            assert!(store.hit("ip:1.2.3.4", rule(3, 60)).is_allowed());
        }
        match store.hit("ip:1.2.3.4", rule(3, 60)) {
            Decision::Limited { retry_after_secs } => {
                assert!(retry_after_secs >= 1);
                assert!(retry_after_secs <= 60);
            }
            Decision::Allowed => panic!("expected denial"),
        }
    }

    #[test]
    fn test_keys_are_independent() {
        let store = MemoryRateStore::new();
        assert!(store.hit("ip:1.2.3.4", rule(1, 60)).is_allowed());
        assert!(store.hit("ip:5.6.7.8", rule(1, 60)).is_allowed());
        assert!(!store.hit("ip:1.2.3.4", rule(1, 60)).is_allowed());
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let store = MemoryRateStore::new();
        let tiny = rule(1, 0);
        assert!(store.hit("k", tiny).is_allowed());
        // A zero-length window has always expired by the next hit.
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.hit("k", tiny).is_allowed());
    }

    #[test]
    fn test_dedupe_once() {
        let store = MemoryRateStore::new();
        let ttl = Duration::from_secs(60);
        assert!(store.set_if_absent("view:1.2.3.4:jane", ttl));
        assert!(!store.set_if_absent("view:1.2.3.4:jane", ttl));
        assert!(store.set_if_absent("view:1.2.3.4:other", ttl));
    }

    #[test]
    fn test_eviction_drops_stale_entries() {
        let store = MemoryRateStore::with_max_entries(2);
        let expired = rule(1, 0);
        store.hit("a", expired);
        store.hit("b", expired);
        store.hit("c", expired);
        std::thread::sleep(Duration::from_millis(5));
        // The next hit crosses the threshold and sweeps expired windows.
        store.hit("d", rule(1, 60));
        let counters = store.counters.lock().expect("lock");
        assert!(counters.len() <= 2, "stale entries not evicted");
    }

    #[test]
    fn test_check_all_requires_every_window() {
        let limiter = RateLimiter::in_process(true);
        let checks = vec![
            ("burst:ip".to_owned(), rule(10, 10)),
            ("sustained:ip".to_owned(), rule(1, 600)),
        ];
        assert!(limiter.check_all(&checks).is_allowed());
        // Second hit passes the burst window but trips the sustained one.
        assert!(!limiter.check_all(&checks).is_allowed());
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let limiter = RateLimiter::in_process(false);
        let checks = vec![("k".to_owned(), rule(0, 60))];
        for _ in 0..100 {
            assert!(limiter.check_all(&checks).is_allowed());
            assert!(limiter.dedupe_once("k", Duration::from_secs(60)));
        }
    }
}

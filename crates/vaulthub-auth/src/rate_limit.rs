// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window rate limiting of credential issuance.
//!
//! The limiter is chosen once at startup and shared behind `Arc<dyn RateLimiter>`.
//! The sliding-window variant holds at most `max_keys` identities; when full it
//! evicts idle identities first and otherwise the least recently hit one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use vaulthub_config::model::RateLimitConfig;

pub trait RateLimiter: Send + Sync {
    /// Record an attempt for `key`. Returns `false` if it must be rejected.
    fn allow(&self, key: &str) -> bool;
}

/// Allows everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn allow(&self, _key: &str) -> bool {
        true
    }
}

#[derive(Debug)]
struct Window {
    hits: VecDeque<Instant>,
    last_hit: Instant,
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    window: Duration,
    burst: usize,
    max_keys: usize,
    windows: DashMap<String, Window>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, burst: usize, max_keys: usize) -> Self {
        Self {
            window,
            burst,
            max_keys: max_keys.max(1),
            windows: DashMap::new(),
        }
    }

    /// [`RateLimiter::allow`] against an explicit clock.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        if key.is_empty() || self.burst == 0 {
            return true;
        }
        // No map guard may be held across eviction.
        if !self.windows.contains_key(key) && self.windows.len() >= self.max_keys {
            self.evict(now);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            hits: VecDeque::with_capacity(self.burst),
            last_hit: now,
        });
        prune(&mut entry.hits, now, self.window);
        if entry.hits.len() >= self.burst {
            debug!(burst = self.burst, "rate limit exceeded");
            return false;
        }
        entry.hits.push_back(now);
        entry.last_hit = now;
        true
    }

    /// Number of identities currently held.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    fn evict(&self, now: Instant) {
        let window = self.window;
        self.windows.retain(|_, w| {
            prune(&mut w.hits, now, window);
            !w.hits.is_empty()
        });
        if self.windows.len() < self.max_keys {
            return;
        }
        let oldest = self
            .windows
            .iter()
            .min_by_key(|w| w.value().last_hit)
            .map(|w| w.key().clone());
        if let Some(oldest) = oldest {
            self.windows.remove(&oldest);
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }
}

fn prune(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = hits.front() {
        if now.saturating_duration_since(front) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

/// Build the limiter selected by configuration.
pub fn from_config(config: &RateLimitConfig) -> Arc<dyn RateLimiter> {
    if config.enabled {
        Arc::new(SlidingWindowLimiter::new(
            Duration::from_secs(config.window_secs),
            config.burst as usize,
            config.max_tracked_keys,
        ))
    } else {
        Arc::new(NoopRateLimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_reject_then_recover() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 2, 10);
        let t0 = Instant::now();
        assert!(limiter.allow_at("a@example.com", t0));
        assert!(limiter.allow_at("a@example.com", t0 + Duration::from_secs(1)));
        assert!(!limiter.allow_at("a@example.com", t0 + Duration::from_secs(2)));
        // First hit slides out of the window.
        assert!(limiter.allow_at("a@example.com", t0 + Duration::from_secs(60)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 1, 10);
        let t0 = Instant::now();
        assert!(limiter.allow_at("a", t0));
        assert!(!limiter.allow_at("a", t0));
        assert!(limiter.allow_at("b", t0));
    }

    #[test]
    fn empty_key_always_allowed() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 1, 10);
        let t0 = Instant::now();
        for _ in 0..5 {
            assert!(limiter.allow_at("", t0));
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn capacity_is_bounded_and_evicts_idle_first() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(10), 5, 2);
        let t0 = Instant::now();
        assert!(limiter.allow_at("idle", t0));
        assert!(limiter.allow_at("busy", t0 + Duration::from_secs(8)));

        // "idle" has aged out of the window by t0 + 12s, "busy" has not.
        assert!(limiter.allow_at("new", t0 + Duration::from_secs(12)));
        assert_eq!(limiter.tracked_keys(), 2);
        assert!(limiter.windows.contains_key("busy"));
        assert!(!limiter.windows.contains_key("idle"));
    }

    #[test]
    fn full_of_active_keys_evicts_least_recently_hit() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 5, 2);
        let t0 = Instant::now();
        assert!(limiter.allow_at("first", t0));
        assert!(limiter.allow_at("second", t0 + Duration::from_secs(1)));
        assert!(limiter.allow_at("third", t0 + Duration::from_secs(2)));

        assert_eq!(limiter.tracked_keys(), 2);
        assert!(!limiter.windows.contains_key("first"));
    }

    #[test]
    fn concurrent_attempts_never_exceed_burst() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 5, 100);
        let t0 = Instant::now();
        let allowed: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let limiter = &limiter;
                    scope.spawn(move || {
                        let shared = limiter.allow_at("shared@example.com", t0);
                        limiter.allow_at(&format!("user{i}@example.com"), t0);
                        usize::from(shared)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(allowed, 5);
        assert_eq!(limiter.tracked_keys(), 17);
    }

    #[test]
    fn config_selects_variant() {
        let mut config = RateLimitConfig {
            enabled: false,
            window_secs: 60,
            burst: 1,
            max_tracked_keys: 10,
        };
        let noop = from_config(&config);
        assert!(noop.allow("x") && noop.allow("x"));

        config.enabled = true;
        let limited = from_config(&config);
        assert!(limited.allow("x"));
        assert!(!limited.allow("x"));
    }
}

//! Fixed-window per-(user, action) rate limiter.
//!
//! Process-local, best-effort throttling state: lazily evicted on access,
//! periodically swept by a background task, and eagerly trimmed at a size
//! ceiling. Fixed windows mean boundary bursts can reach 2x the nominal
//! rate; that is the accepted cost of O(1) bookkeeping. Not suitable as a
//! hard security control across multiple service instances.

use crate::domain::models::RateLimitConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Outcome of a throttle check. Being limited is a normal outcome, not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

struct WindowEntry {
    count: u32,
    window_reset_at: Instant,
}

/// Fixed-window limiter with explicit lifecycle: construct at startup,
/// `start` the sweeper, `stop` it on shutdown, pass by handle into request
/// handling.
pub struct FixedWindowRateLimiter {
    entries: Mutex<HashMap<(String, String), WindowEntry>>,
    config: RateLimitConfig,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl FixedWindowRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
            sweeper: Mutex::new(None),
        }
    }

    fn ceiling(&self, action: &str) -> u32 {
        self.config
            .action_limits
            .get(action)
            .copied()
            .unwrap_or(self.config.max_per_window)
    }

    /// Check and count one request for (user, action).
    pub async fn check(&self, user_id: &str, action: &str) -> Decision {
        self.check_at(user_id, action, Instant::now()).await
    }

    async fn check_at(&self, user_id: &str, action: &str, now: Instant) -> Decision {
        let window = Duration::from_secs(self.config.window_secs);
        let key = (user_id.to_string(), action.to_string());
        let mut entries = self.entries.lock().await;

        // Eager cleanup once the table hits its size ceiling. A burst of
        // distinct keys inside one window leaves nothing expired to drop;
        // the entry closest to reset is evicted so the table never grows
        // past the ceiling.
        if entries.len() >= self.config.max_entries && !entries.contains_key(&key) {
            entries.retain(|_, entry| now < entry.window_reset_at);
            while entries.len() >= self.config.max_entries {
                let Some(soonest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.window_reset_at)
                    .map(|(key, _)| key.clone())
                else {
                    break;
                };
                entries.remove(&soonest);
            }
        }
        match entries.get_mut(&key) {
            Some(entry) if now < entry.window_reset_at => {
                if entry.count < self.ceiling(action) {
                    entry.count += 1;
                    Decision::Allowed
                } else {
                    let retry_after = entry.window_reset_at.saturating_duration_since(now);
                    Decision::Limited {
                        retry_after_secs: retry_after.as_secs().max(1),
                    }
                }
            }
            // No entry, or the window has elapsed: reset and allow.
            _ => {
                entries.insert(
                    key,
                    WindowEntry {
                        count: 1,
                        window_reset_at: now + window,
                    },
                );
                Decision::Allowed
            }
        }
    }

    /// Drop every entry whose window has elapsed.
    pub async fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.window_reset_at);
        debug!(evicted = before - entries.len(), remaining = entries.len(), "rate limit sweep");
    }

    /// Spawn the periodic background sweeper. Idempotent.
    pub async fn start(self: &Arc<Self>) {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.is_some() {
            return;
        }
        let limiter = Arc::clone(self);
        let interval = Duration::from_secs(self.config.sweep_interval_secs);
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limiter.sweep().await;
            }
        }));
    }

    /// Stop the background sweeper.
    pub async fn stop(&self) {
        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_per_window: u32) -> RateLimitConfig {
        RateLimitConfig {
            window_secs: 60,
            max_per_window,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_allows_up_to_ceiling_then_rejects() {
        let limiter = FixedWindowRateLimiter::new(config(3));
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.check_at("u", "assign", now).await, Decision::Allowed);
        }
        match limiter.check_at("u", "assign", now).await {
            Decision::Limited { retry_after_secs } => assert!(retry_after_secs > 0),
            Decision::Allowed => panic!("request over the ceiling should be limited"),
        }
    }

    #[tokio::test]
    async fn test_window_elapse_resets() {
        let limiter = FixedWindowRateLimiter::new(config(1));
        let now = Instant::now();

        assert!(limiter.check_at("u", "verify", now).await.is_allowed());
        assert!(!limiter.check_at("u", "verify", now).await.is_allowed());

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at("u", "verify", later).await.is_allowed());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = FixedWindowRateLimiter::new(config(1));
        let now = Instant::now();

        assert!(limiter.check_at("u1", "assign", now).await.is_allowed());
        assert!(limiter.check_at("u2", "assign", now).await.is_allowed());
        assert!(limiter.check_at("u1", "verify", now).await.is_allowed());
        assert!(!limiter.check_at("u1", "assign", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_per_action_override() {
        let mut cfg = config(5);
        cfg.action_limits.insert("author".to_string(), 1);
        let limiter = FixedWindowRateLimiter::new(cfg);
        let now = Instant::now();

        assert!(limiter.check_at("u", "author", now).await.is_allowed());
        assert!(!limiter.check_at("u", "author", now).await.is_allowed());
        // Unlisted actions use the default ceiling.
        assert!(limiter.check_at("u", "assign", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_size_ceiling_triggers_eager_cleanup() {
        let cfg = RateLimitConfig {
            window_secs: 60,
            max_per_window: 5,
            max_entries: 4,
            ..Default::default()
        };
        let limiter = FixedWindowRateLimiter::new(cfg);
        let now = Instant::now();

        for i in 0..4 {
            limiter.check_at(&format!("u{i}"), "assign", now).await;
        }
        assert_eq!(limiter.entry_count().await, 4);

        // All four windows have elapsed by now + 61s; the ceiling check
        // evicts them before admitting the new key.
        let later = now + Duration::from_secs(61);
        limiter.check_at("u-new", "assign", later).await;
        assert_eq!(limiter.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_size_ceiling_holds_against_distinct_key_burst() {
        let cfg = RateLimitConfig {
            window_secs: 60,
            max_per_window: 5,
            max_entries: 3,
            ..Default::default()
        };
        let limiter = FixedWindowRateLimiter::new(cfg);
        let now = Instant::now();

        // All windows stay live; nothing is expired to reclaim.
        for i in 0..10 {
            let decision = limiter.check_at(&format!("u{i}"), "assign", now).await;
            assert!(decision.is_allowed());
            assert!(limiter.entry_count().await <= 3);
        }

        // An established key keeps its count across the evictions it survives.
        assert!(limiter.check_at("u9", "assign", now).await.is_allowed());
        assert!(limiter.entry_count().await <= 3);
    }

    #[tokio::test]
    async fn test_sweep_evicts_elapsed_windows() {
        let cfg = RateLimitConfig {
            window_secs: 0,
            ..Default::default()
        };
        let limiter = FixedWindowRateLimiter::new(cfg);
        limiter.check("u", "assign").await;
        limiter.sweep().await;
        assert_eq!(limiter.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweeper_lifecycle() {
        let limiter = Arc::new(FixedWindowRateLimiter::new(config(5)));
        limiter.start().await;
        limiter.start().await; // idempotent
        limiter.stop().await;
        limiter.stop().await;
    }
}

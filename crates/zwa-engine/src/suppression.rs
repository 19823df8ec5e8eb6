//! Suppression windows for categorical alerts
//!
//! After a notification state is reported, identical reports for the same
//! source are swallowed until either the state changes or the window
//! expires.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Default lifetime of a window
pub const DEFAULT_WINDOW_TTL: Duration = Duration::from_secs(30 * 60);

struct Window {
    state: String,
    /// Identifies this window instance; a timer only removes its own window
    generation: u64,
    timer: JoinHandle<()>,
}

/// Table of open suppression windows keyed by alert source
///
/// Every check and mutation of a key runs under that key's map entry lock,
/// and expiry timers go through the same lock. A timer that loses the race
/// against a replacement finds a different generation and leaves the new
/// window alone.
pub struct SuppressionTracker {
    windows: Arc<DashMap<String, Window>>,
    next_generation: AtomicU64,
    ttl: Duration,
}

impl SuppressionTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(1),
            ttl,
        }
    }

    /// Decide whether a report of `state` for `key` is a duplicate
    ///
    /// - no window: not suppressed
    /// - window with the same state: suppressed (expiry is not extended)
    /// - window with another state: the window is cancelled and discarded,
    ///   not suppressed
    pub fn should_suppress(&self, key: &str, state: &str) -> bool {
        match self.windows.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().state == state => {
                trace!(key, state, "Suppressing duplicate alert");
                true
            }
            Entry::Occupied(entry) => {
                let (_, window) = entry.remove_entry();
                window.timer.abort();
                debug!(key, old = %window.state, new = state, "State changed, window closed");
                false
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Open a window for `key`, replacing any existing one
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self, key: &str, state: &str) {
        let ttl = self.ttl;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        // Holding the entry while spawning keeps the timer from observing
        // the table before the window is installed
        let entry = self.windows.entry(key.to_string());

        let windows = Arc::clone(&self.windows);
        let timer_key = key.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if windows
                .remove_if(&timer_key, |_, w| w.generation == generation)
                .is_some()
            {
                debug!(key = %timer_key, "Suppression window expired");
            }
        });

        let window = Window {
            state: state.to_string(),
            generation,
            timer,
        };
        match entry {
            Entry::Occupied(mut entry) => entry.insert(window).timer.abort(),
            Entry::Vacant(entry) => {
                entry.insert(window);
            }
        }
        trace!(key, state, ttl_secs = ttl.as_secs(), "Suppression window opened");
    }

    pub fn is_open(&self, key: &str) -> bool {
        self.windows.contains_key(key)
    }

    /// State that opened the window for `key`, if one is open
    pub fn state(&self, key: &str) -> Option<String> {
        self.windows.get(key).map(|w| w.state.clone())
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Cancel every timer and forget all windows
    pub fn clear(&self) {
        self.windows.retain(|_, w| {
            w.timer.abort();
            false
        });
    }
}

impl Default for SuppressionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_TTL)
    }
}

impl Drop for SuppressionTracker {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_window_is_not_suppressed() {
        let tracker = SuppressionTracker::default();
        assert!(!tracker.should_suppress("k", "open"));
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_same_state_is_suppressed() {
        let tracker = SuppressionTracker::default();
        tracker.open("k", "open");

        assert!(tracker.should_suppress("k", "open"));
        assert!(tracker.should_suppress("k", "open"));
        assert_eq!(tracker.state("k").as_deref(), Some("open"));
    }

    #[tokio::test]
    async fn test_different_state_discards_window() {
        let tracker = SuppressionTracker::default();
        tracker.open("k", "open");

        assert!(!tracker.should_suppress("k", "idle"));
        assert!(!tracker.is_open("k"));
        // The discarded window no longer suppresses its own state either
        assert!(!tracker.should_suppress("k", "open"));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let tracker = SuppressionTracker::default();
        tracker.open("a", "open");

        assert!(!tracker.should_suppress("b", "open"));
        assert!(tracker.should_suppress("a", "open"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expires() {
        let tracker = SuppressionTracker::new(Duration::from_secs(60));
        tracker.open("k", "open");

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(tracker.should_suppress("k", "open"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!tracker.is_open("k"));
        assert!(!tracker.should_suppress("k", "open"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppression_does_not_extend_expiry() {
        let tracker = SuppressionTracker::new(Duration::from_secs(60));
        tracker.open("k", "open");

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_secs(10)).await;
            assert!(tracker.should_suppress("k", "open"));
        }

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(!tracker.is_open("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_keeps_replacement() {
        let tracker = SuppressionTracker::new(Duration::from_secs(60));
        tracker.open("k", "open");

        tokio::time::sleep(Duration::from_secs(50)).await;
        tracker.open("k", "closed");

        // First window's deadline passes; the replacement must survive
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(tracker.state("k").as_deref(), Some("closed"));

        tokio::time::sleep(Duration::from_secs(41)).await;
        assert!(!tracker.is_open("k"));
    }

    #[tokio::test]
    async fn test_clear() {
        let tracker = SuppressionTracker::default();
        tracker.open("a", "open");
        tracker.open("b", "open");
        assert_eq!(tracker.len(), 2);

        tracker.clear();
        assert!(tracker.is_empty());
    }
}

//! Shared per-symbol detection state.
//!
//! [`SymbolStateStore`] owns two maps:
//!
//! 1. **Volume history** — keyed by [`SymbolKey`] (segment + symbol), a
//!    bounded FIFO of the most recent 24h quote-volume readings.
//! 2. **Escalation windows** — keyed by symbol only, timestamps of recent
//!    qualifying volume alerts. Both segments write to the same window.
//!
//! # Thread safety
//!
//! The store is shared between all feed managers behind an `Arc`. Each map
//! sits behind its own `parking_lot::Mutex`; every public method takes the
//! lock once, so operations are linearizable per key. Locks are never held
//! across an `.await`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::types::{Segment, SymbolKey};

/// Result of recording one volume reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeDelta {
    /// Second-to-last reading, `None` until two readings exist.
    pub previous: Option<f64>,
    pub current: f64,
}

impl VolumeDelta {
    /// `current - previous`, when a previous reading exists.
    pub fn change(&self) -> Option<f64> {
        self.previous.map(|p| self.current - p)
    }
}

pub struct SymbolStateStore {
    capacity: usize,
    volumes: Mutex<AHashMap<SymbolKey, VecDeque<f64>>>,
    escalations: Mutex<AHashMap<String, VecDeque<Instant>>>,
}

impl SymbolStateStore {
    /// Create an empty store keeping at most `capacity` readings per key.
    ///
    /// A capacity below 2 is raised to 2, the minimum for a delta.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            volumes: Mutex::new(AHashMap::new()),
            escalations: Mutex::new(AHashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // -----------------------------------------------------------------------
    // Volume history
    // -----------------------------------------------------------------------

    /// Append a reading for `key`, evicting the oldest past capacity.
    ///
    /// Returns the two most recent readings.
    pub fn record_volume(&self, key: &SymbolKey, value: f64) -> VolumeDelta {
        let mut map = self.volumes.lock();
        let history = map.entry(key.clone()).or_insert_with(|| VecDeque::with_capacity(self.capacity));

        history.push_back(value);
        while history.len() > self.capacity {
            history.pop_front();
        }

        let previous = history.len().checked_sub(2).and_then(|i| history.get(i)).copied();
        VolumeDelta { previous, current: value }
    }

    /// Snapshot of the readings for `key`, oldest first.
    pub fn history(&self, key: &SymbolKey) -> Vec<f64> {
        self.volumes.lock().get(key).map(|h| h.iter().copied().collect()).unwrap_or_default()
    }

    /// Number of symbols with volume history in `segment`.
    pub fn tracked_symbols(&self, segment: Segment) -> usize {
        self.volumes.lock().keys().filter(|k| k.segment == segment).count()
    }

    // -----------------------------------------------------------------------
    // Escalation windows
    // -----------------------------------------------------------------------

    /// Append `now` to the window of `symbol` and drop entries older than `window`.
    ///
    /// An entry exactly `window` old is kept. Returns the pruned length.
    pub fn append_escalation(&self, symbol: &str, now: Instant, window: Duration) -> usize {
        let mut map = self.escalations.lock();
        let events = map.entry(symbol.to_owned()).or_default();
        events.push_back(now);
        prune(events, now, window);
        events.len()
    }

    /// Empty the window of `symbol`.
    pub fn clear_escalation(&self, symbol: &str) {
        if let Some(events) = self.escalations.lock().get_mut(symbol) {
            events.clear();
        }
    }

    /// Append and prune under one lock, clearing the window once it reaches
    /// `threshold`.
    ///
    /// Returns the count that triggered the escalation, or `None`.
    pub fn escalate(&self, symbol: &str, now: Instant, window: Duration, threshold: usize) -> Option<usize> {
        let mut map = self.escalations.lock();
        let events = map.entry(symbol.to_owned()).or_default();
        events.push_back(now);
        prune(events, now, window);

        let count = events.len();
        if count >= threshold {
            events.clear();
            Some(count)
        } else {
            None
        }
    }

    /// Current window length for `symbol` (no pruning).
    pub fn escalation_len(&self, symbol: &str) -> usize {
        self.escalations.lock().get(symbol).map_or(0, VecDeque::len)
    }
}

/// Drop timestamps strictly older than `window` relative to `now`.
fn prune(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = events.front() {
        if now.saturating_duration_since(front) > window {
            events.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(600);

    fn key(segment: Segment, sym: &str) -> SymbolKey {
        SymbolKey::new(segment, sym)
    }

    #[test]
    fn first_reading_has_no_previous() {
        let store = SymbolStateStore::new(5);
        let d = store.record_volume(&key(Segment::Futures, "BTCUSDT"), 10.0);
        assert_eq!(d.previous, None);
        assert_eq!(d.change(), None);
    }

    #[test]
    fn delta_uses_two_most_recent() {
        let store = SymbolStateStore::new(5);
        let k = key(Segment::Futures, "BTCUSDT");
        store.record_volume(&k, 1.0);
        store.record_volume(&k, 5.0);
        let d = store.record_volume(&k, 7.0);
        assert_eq!(d.previous, Some(5.0));
        assert_eq!(d.change(), Some(2.0));
    }

    #[test]
    fn history_is_bounded_fifo() {
        let store = SymbolStateStore::new(5);
        let k = key(Segment::Spot, "ETHUSDT");
        for i in 0..12 {
            store.record_volume(&k, i as f64);
            assert!(store.history(&k).len() <= 5);
        }
        assert_eq!(store.history(&k), vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn segments_are_isolated() {
        let store = SymbolStateStore::new(5);
        let fut = key(Segment::Futures, "BTCUSDT");
        let spot = key(Segment::Spot, "BTCUSDT");
        store.record_volume(&fut, 100.0);
        store.record_volume(&spot, 1.0);
        store.record_volume(&spot, 2.0);
        assert_eq!(store.history(&fut), vec![100.0]);
        assert_eq!(store.tracked_symbols(Segment::Futures), 1);
        assert_eq!(store.tracked_symbols(Segment::Spot), 1);
    }

    #[test]
    fn prune_keeps_boundary_entry() {
        let store = SymbolStateStore::new(5);
        let t0 = Instant::now();
        store.append_escalation("ETHUSDT", t0, WINDOW);
        // Exactly one window later: t0 is retained.
        assert_eq!(store.append_escalation("ETHUSDT", t0 + WINDOW, WINDOW), 2);
        // One millisecond past: t0 is dropped.
        let n = store.append_escalation("ETHUSDT", t0 + WINDOW + Duration::from_millis(1), WINDOW);
        assert_eq!(n, 2);
    }

    #[test]
    fn clear_empties_window() {
        let store = SymbolStateStore::new(5);
        let t0 = Instant::now();
        store.append_escalation("SOLUSDT", t0, WINDOW);
        store.append_escalation("SOLUSDT", t0, WINDOW);
        store.clear_escalation("SOLUSDT");
        assert_eq!(store.escalation_len("SOLUSDT"), 0);
        store.clear_escalation("UNKNOWN");
    }

    #[test]
    fn escalate_fires_once_then_restarts() {
        let store = SymbolStateStore::new(5);
        let t0 = Instant::now();
        assert_eq!(store.escalate("ETHUSDT", t0, WINDOW, 3), None);
        assert_eq!(store.escalate("ETHUSDT", t0 + Duration::from_secs(60), WINDOW, 3), None);
        assert_eq!(store.escalate("ETHUSDT", t0 + Duration::from_secs(120), WINDOW, 3), Some(3));
        assert_eq!(store.escalation_len("ETHUSDT"), 0);
        assert_eq!(store.escalate("ETHUSDT", t0 + Duration::from_secs(180), WINDOW, 3), None);
        assert_eq!(store.escalation_len("ETHUSDT"), 1);
    }

    #[test]
    fn concurrent_escalation_is_not_lost() {
        let store = Arc::new(SymbolStateStore::new(5));
        let now = Instant::now();
        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let fired = fired.clone();
                std::thread::spawn(move || {
                    for _ in 0..300 {
                        if store.escalate("BTCUSDT", now, WINDOW, 3).is_some() {
                            fired.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // 2400 appends, every third one fires.
        assert_eq!(fired.load(std::sync::atomic::Ordering::Relaxed), 800);
        assert_eq!(store.escalation_len("BTCUSDT"), 0);
    }
}

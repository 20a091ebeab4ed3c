//! Processed webhook event ids
//!
//! Stripe delivers events at least once. The id is claimed before the event
//! is handled so a concurrent redelivery sees it as a duplicate; a failed
//! handler forgets the id so Stripe's retry gets processed.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::util::now_millis;

/// How long an event id is remembered
pub const PROCESSED_EVENT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Default)]
pub struct ProcessedEvents {
    /// event id -> first seen (unix millis)
    seen: DashMap<String, i64>,
}

impl ProcessedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an event id. Returns `false` if it was already claimed.
    pub fn first_seen(&self, event_id: &str) -> bool {
        match self.seen.entry(event_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now_millis());
                true
            }
        }
    }

    pub fn forget(&self, event_id: &str) {
        self.seen.remove(event_id);
    }

    /// Drop ids first seen longer than `max_age` ago
    pub fn sweep(&self, max_age: Duration) -> usize {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now_millis().saturating_sub(max_age_ms);
        let before = self.seen.len();
        self.seen.retain(|_, first_seen| *first_seen > cutoff);
        before.saturating_sub(self.seen.len())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_detected() {
        let events = ProcessedEvents::new();
        assert!(events.first_seen("evt_1"));
        assert!(!events.first_seen("evt_1"));
        assert!(events.first_seen("evt_2"));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_forget_allows_retry() {
        let events = ProcessedEvents::new();
        assert!(events.first_seen("evt_1"));
        events.forget("evt_1");
        assert!(events.first_seen("evt_1"));
    }

    #[test]
    fn test_sweep() {
        let events = ProcessedEvents::new();
        events.first_seen("evt_1");
        assert_eq!(events.sweep(PROCESSED_EVENT_RETENTION), 0);
        assert_eq!(events.len(), 1);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(events.sweep(Duration::ZERO), 1);
        assert!(events.is_empty());
    }
}

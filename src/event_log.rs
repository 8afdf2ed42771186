//! In-memory event log: an append-only, capacity-bounded ring of
//! `(time, event_kind, entity_id, outcome)` tuples, matching the optional
//! persisted-state shape spec.md §6 allows. No file I/O — persistence of
//! run metrics is out of scope; a host program drains and writes this
//! itself if it wants a record on disk.

use std::collections::VecDeque;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub time: f64,
    pub event_kind: String,
    pub entity_id: u64,
    pub outcome: String,
}

#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    records: RwLock<VecDeque<EventRecord>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, records: RwLock::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn record(&self, time: f64, event_kind: impl Into<String>, entity_id: u64, outcome: impl Into<String>) {
        let mut records = self.records.write().unwrap();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(EventRecord { time, event_kind: event_kind.into(), entity_id, outcome: outcome.into() });
    }

    /// Drains and returns every record collected so far, oldest first.
    pub fn drain(&self) -> Vec<EventRecord> {
        self.records.write().unwrap().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_once_capacity_is_reached() {
        let log = EventLog::new(2);
        log.record(0.0, "admit", 1, "ok");
        log.record(1.0, "admit", 2, "ok");
        log.record(2.0, "admit", 3, "ok");

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].entity_id, 2);
        assert_eq!(drained[1].entity_id, 3);
    }
}

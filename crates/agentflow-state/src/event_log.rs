//! Bounded, replayable log of decoded inbound events.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use agentflow_protocol::InboundEvent;

pub const DEFAULT_LOG_CAPACITY: usize = 1_024;

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub seq: u64,
    pub received_at: DateTime<Utc>,
    pub event: InboundEvent,
}

/// Oldest entries are evicted once `capacity` is reached.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<LoggedEvent>,
    capacity: usize,
    next_seq: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, event: InboundEvent) -> u64 {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(LoggedEvent {
            seq,
            received_at: Utc::now(),
            event,
        });
        seq
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.entries.iter()
    }

    /// Retained events in arrival order, ready to be replayed.
    pub fn events(&self) -> Vec<InboundEvent> {
        self.entries.iter().map(|e| e.event.clone()).collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

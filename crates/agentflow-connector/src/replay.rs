//! Offline replay of a JSON-lines event capture.

use serde::Serialize;

use agentflow_protocol::{decode_event, ConnectionState, Decoded, InboundEvent};
use agentflow_state::{Snapshot, SyncState, Topology};

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub events: usize,
    pub malformed: usize,
    pub unknown: usize,
    pub snapshot: Snapshot,
}

/// Decode every non-blank line of `text` and reduce the events from a fresh
/// state. Lines that fail to decode are counted and skipped.
pub fn replay_lines(topology: Topology, text: &str) -> ReplayReport {
    let mut malformed = 0;
    let mut unknown = 0;
    let mut events: Vec<InboundEvent> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match decode_event(line) {
            Ok(Decoded::Event(event)) => events.push(event),
            Ok(Decoded::Unknown { .. }) => unknown += 1,
            Err(e) => {
                tracing::warn!(line = idx + 1, error = %e, "Skipping malformed line");
                malformed += 1;
            }
        }
    }

    let count = events.len();
    let state = SyncState::replay(topology, events);
    ReplayReport {
        events: count,
        malformed,
        unknown,
        snapshot: state.snapshot(ConnectionState::Disconnected),
    }
}

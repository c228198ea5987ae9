//! Agents currently "speaking/working", used only for an activity indicator.
//!
//! Membership follows the agent that *emits* events: a `progress` event adds
//! its `source`, a `response` or `error` from that source removes it. Node
//! statuses in the workflow graph are tracked separately and are not
//! consulted here.

use std::collections::BTreeSet;

use agentflow_protocol::{AgentId, InboundEvent};

#[derive(Debug, Default, Clone)]
pub struct ActiveAgents {
    members: BTreeSet<AgentId>,
}

impl ActiveAgents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &InboundEvent) {
        match event {
            InboundEvent::Progress { source, .. } => {
                self.members.insert(source.clone());
            }
            InboundEvent::Response { source, .. } | InboundEvent::Error { source, .. } => {
                self.members.remove(source);
            }
            InboundEvent::Stream { .. } => {}
        }
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.members.contains(agent_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sorted member ids.
    pub fn to_vec(&self) -> Vec<AgentId> {
        self.members.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}

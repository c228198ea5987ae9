//! Workflow graph projection.
//!
//! Reduces decoded events into node statuses and edge activity. The
//! projection never advances on its own: `start` only arms it, and the entry
//! node moves to processing when the first inbound event of the run arrives.
//! Edges, once activated, stay active until `stop` or `reset`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use agentflow_protocol::{InboundEvent, NodeStatus, ResponseStatus};

use crate::node_machine::{NodeEvent, NodeStateMachine};
use crate::topology::{AgentEdge, AgentNode, Topology};

/// Phase of the current workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    /// No run started since the last reset.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// The run was stopped; every node reports complete.
    Stopped,
}

pub struct WorkflowProjection {
    initial: Topology,
    nodes: Vec<AgentNode>,
    edges: Vec<AgentEdge>,
    /// node id -> position in `nodes`
    index: HashMap<String, usize>,
    phase: RunPhase,
    awaiting_first_event: bool,
}

impl WorkflowProjection {
    pub fn new(topology: Topology) -> Self {
        let nodes = topology.nodes().to_vec();
        let edges = topology.edges().to_vec();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        Self {
            initial: topology,
            nodes,
            edges,
            index,
            phase: RunPhase::Idle,
            awaiting_first_event: false,
        }
    }

    pub fn nodes(&self) -> &[AgentNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[AgentEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&AgentNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, id: &str) -> Option<&AgentEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn entry(&self) -> &str {
        self.initial.entry()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: &InboundEvent) {
        if self.awaiting_first_event {
            self.awaiting_first_event = false;
            let entry = self.initial.entry().to_string();
            self.begin_if_idle(&entry);
        }

        match event {
            InboundEvent::Stream { .. } => {}
            InboundEvent::Progress {
                source,
                target,
                message,
                progress,
            } => {
                let begin = NodeEvent::Begin {
                    task: message.clone(),
                    progress: *progress,
                };
                if self.transition(target, begin) {
                    self.activate_edges(source, target);
                }
            }
            InboundEvent::Response {
                target: Some(target),
                status: ResponseStatus::Complete,
                ..
            } => {
                self.begin_if_idle(target);
                self.transition(target, NodeEvent::Finish);
            }
            InboundEvent::Response { .. } => {}
            InboundEvent::Error {
                source,
                target,
                message,
            } => {
                let node_id = target.as_deref().unwrap_or(source);
                self.begin_if_idle(node_id);
                self.transition(
                    node_id,
                    NodeEvent::Fail {
                        error: message.clone(),
                    },
                );
            }
        }
    }

    /// Return to the initial topology and arm the entry node for the run.
    pub fn start(&mut self) {
        self.restore_initial();
        self.phase = RunPhase::Running;
        self.awaiting_first_event = true;
        tracing::info!(entry = %self.initial.entry(), "Workflow run started");
    }

    /// Freeze the graph: every node complete, every edge inactive.
    pub fn stop(&mut self) {
        for node in &mut self.nodes {
            // ForceComplete is legal from every status.
            let _ = NodeStateMachine::apply(node, NodeEvent::ForceComplete);
        }
        self.deactivate_edges();
        self.phase = RunPhase::Stopped;
        self.awaiting_first_event = false;
        tracing::info!("Workflow run stopped");
    }

    /// Every node idle, every edge inactive.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            let _ = NodeStateMachine::apply(node, NodeEvent::Reset);
        }
        self.deactivate_edges();
        self.phase = RunPhase::Idle;
        self.awaiting_first_event = false;
        tracing::info!("Workflow reset");
    }

    fn restore_initial(&mut self) {
        self.nodes = self.initial.nodes().to_vec();
        self.edges = self.initial.edges().to_vec();
    }

    fn deactivate_edges(&mut self) {
        for edge in &mut self.edges {
            edge.set_active(false);
        }
    }

    fn activate_edges(&mut self, source: &str, target: &str) {
        for edge in self
            .edges
            .iter_mut()
            .filter(|e| e.source == source && e.target == target)
        {
            edge.set_active(true);
        }
    }

    /// A terminal report for a node that never reported progress implies it
    /// started; walk it through `Processing` first.
    fn begin_if_idle(&mut self, node_id: &str) {
        let idle = self
            .node(node_id)
            .map(|n| n.status == NodeStatus::Idle)
            .unwrap_or(false);
        if idle {
            self.transition(
                node_id,
                NodeEvent::Begin {
                    task: None,
                    progress: 0,
                },
            );
        }
    }

    /// Returns true when the transition was applied.
    fn transition(&mut self, node_id: &str, event: NodeEvent) -> bool {
        let Some(&idx) = self.index.get(node_id) else {
            tracing::debug!(node = %node_id, "Ignoring event for unknown node");
            return false;
        };
        match NodeStateMachine::apply(&mut self.nodes[idx], event) {
            Ok(status) => {
                tracing::debug!(node = %node_id, status = %status, "Node transitioned");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring illegal node transition");
                false
            }
        }
    }
}

impl Default for WorkflowProjection {
    fn default() -> Self {
        Self::new(Topology::default())
    }
}

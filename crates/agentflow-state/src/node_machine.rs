//! Per-node status machine.
//!
//! Legal transitions:
//! - `Idle | Processing --Begin--> Processing`
//! - `Processing --Finish--> Complete`
//! - `Processing --Fail--> Error`
//! - `any --Reset--> Idle`
//! - `any --ForceComplete--> Complete`
//!
//! Every transition also settles the transient fields so that a node only
//! carries `current_task`/`progress` while processing and `error` while
//! failed.

use agentflow_protocol::NodeStatus;

use crate::topology::AgentNode;
use crate::StateError;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// Work started or advanced.
    Begin { task: Option<String>, progress: u8 },
    /// The node reported completion.
    Finish,
    /// The node failed with the given text.
    Fail { error: String },
    /// Explicit reset of the run.
    Reset,
    /// Run stopped; freeze and report done.
    ForceComplete,
}

impl NodeEvent {
    fn name(&self) -> &'static str {
        match self {
            NodeEvent::Begin { .. } => "begin",
            NodeEvent::Finish => "finish",
            NodeEvent::Fail { .. } => "fail",
            NodeEvent::Reset => "reset",
            NodeEvent::ForceComplete => "force_complete",
        }
    }
}

pub struct NodeStateMachine;

impl NodeStateMachine {
    pub fn apply(node: &mut AgentNode, event: NodeEvent) -> Result<NodeStatus, StateError> {
        let next = match (node.status, &event) {
            (NodeStatus::Idle | NodeStatus::Processing, NodeEvent::Begin { .. }) => {
                NodeStatus::Processing
            }
            (NodeStatus::Processing, NodeEvent::Finish) => NodeStatus::Complete,
            (NodeStatus::Processing, NodeEvent::Fail { .. }) => NodeStatus::Error,
            (_, NodeEvent::Reset) => NodeStatus::Idle,
            (_, NodeEvent::ForceComplete) => NodeStatus::Complete,
            _ => {
                return Err(StateError::InvalidTransition {
                    node: node.id.clone(),
                    from: node.status,
                    event: event.name(),
                });
            }
        };

        node.status = next;
        match event {
            NodeEvent::Begin { task, progress } => {
                node.current_task = task;
                node.progress = Some(progress);
                node.error = None;
            }
            NodeEvent::Fail { error } => {
                node.current_task = None;
                node.progress = None;
                node.error = Some(error);
            }
            NodeEvent::Finish | NodeEvent::Reset | NodeEvent::ForceComplete => {
                node.current_task = None;
                node.progress = None;
                node.error = None;
            }
        }

        Ok(next)
    }
}

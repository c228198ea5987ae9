use agentflow_protocol::NodeStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Invalid transition for node {node}: {from} -> {event}")]
    InvalidTransition {
        node: String,
        from: NodeStatus,
        event: &'static str,
    },

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
}

//! Fixed agent topology the workflow graph is built from.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use agentflow_protocol::{AgentId, AgentKind, EdgeKind, EdgeStatus, NodeStatus, ENTRY_AGENT};

use crate::StateError;

/// An agent in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    pub kind: AgentKind,
    pub status: NodeStatus,
    /// Only present while `status` is `Processing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    /// Only present while `status` is `Processing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Only present while `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentNode {
    pub fn new(id: &str, name: &str, description: &str, kind: AgentKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            kind,
            status: NodeStatus::Idle,
            current_task: None,
            progress: None,
            error: None,
        }
    }
}

/// A directed control or data relationship between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEdge {
    pub id: String,
    pub source: AgentId,
    pub target: AgentId,
    pub kind: EdgeKind,
    pub status: EdgeStatus,
    /// Mirrors `status == Active`.
    pub animated: bool,
}

impl AgentEdge {
    pub fn new(id: &str, source: &str, target: &str, kind: EdgeKind) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            kind,
            status: EdgeStatus::Inactive,
            animated: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EdgeStatus::Active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.status = if active { EdgeStatus::Active } else { EdgeStatus::Inactive };
        self.animated = active;
    }
}

/// Validated set of nodes and edges plus the designated entry node.
/// Deserialization goes through [`Topology::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTopology")]
pub struct Topology {
    nodes: Vec<AgentNode>,
    edges: Vec<AgentEdge>,
    entry: AgentId,
}

impl Topology {
    /// Build a topology, checking id uniqueness and edge endpoints.
    pub fn new(
        nodes: Vec<AgentNode>,
        edges: Vec<AgentEdge>,
        entry: &str,
    ) -> Result<Self, StateError> {
        let mut node_ids = HashSet::new();
        for node in &nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(StateError::InvalidTopology(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }

        let mut edge_ids = HashSet::new();
        for edge in &edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(StateError::InvalidTopology(format!(
                    "duplicate edge id '{}'",
                    edge.id
                )));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint.as_str()) {
                    return Err(StateError::InvalidTopology(format!(
                        "edge '{}' references unknown node '{}'",
                        edge.id, endpoint
                    )));
                }
            }
        }

        if !node_ids.contains(entry) {
            return Err(StateError::UnknownNode(entry.to_string()));
        }

        Ok(Self {
            nodes,
            edges,
            entry: entry.to_string(),
        })
    }

    /// The six-agent construction planning graph the frontend ships with.
    pub fn construction_agency() -> Self {
        let nodes = vec![
            AgentNode::new(
                "orchestration-agent",
                "Project Orchestration Agent",
                "Coordinates project workflow and agent communication",
                AgentKind::Orchestration,
            ),
            AgentNode::new(
                "document-agent",
                "Document Creation Agent",
                "Creates and manages construction documentation",
                AgentKind::Document,
            ),
            AgentNode::new(
                "technical-agent",
                "Technical Validation Agent",
                "Validates technical aspects and specifications",
                AgentKind::Technical,
            ),
            AgentNode::new(
                "compliance-agent",
                "Compliance Agent",
                "Ensures regulatory compliance",
                AgentKind::Compliance,
            ),
            AgentNode::new(
                "cost-agent",
                "Cost Analysis Agent",
                "Analyzes costs and validates budgets",
                AgentKind::Cost,
            ),
            AgentNode::new(
                "resource-agent",
                "Resource Management Agent",
                "Manages project resources and allocations",
                AgentKind::Resource,
            ),
        ];

        let control = EdgeKind::Control;
        let data = EdgeKind::Data;
        let edges = vec![
            AgentEdge::new("orchestration-doc", "orchestration-agent", "document-agent", control),
            AgentEdge::new("orchestration-tech", "orchestration-agent", "technical-agent", control),
            AgentEdge::new("orchestration-compliance", "orchestration-agent", "compliance-agent", control),
            AgentEdge::new("orchestration-cost", "orchestration-agent", "cost-agent", control),
            AgentEdge::new("orchestration-resource", "orchestration-agent", "resource-agent", control),
            AgentEdge::new("doc-tech", "document-agent", "technical-agent", data),
            AgentEdge::new("doc-compliance", "document-agent", "compliance-agent", data),
            AgentEdge::new("doc-cost", "document-agent", "cost-agent", data),
            AgentEdge::new("tech-compliance", "technical-agent", "compliance-agent", data),
            AgentEdge::new("tech-resource", "technical-agent", "resource-agent", data),
            AgentEdge::new("compliance-resource", "compliance-agent", "resource-agent", data),
            AgentEdge::new("cost-resource", "cost-agent", "resource-agent", data),
        ];

        Self {
            nodes,
            edges,
            entry: ENTRY_AGENT.to_string(),
        }
    }

    pub fn nodes(&self) -> &[AgentNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[AgentEdge] {
        &self.edges
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }
}

#[derive(Deserialize)]
struct RawTopology {
    nodes: Vec<AgentNode>,
    edges: Vec<AgentEdge>,
    entry: AgentId,
}

impl TryFrom<RawTopology> for Topology {
    type Error = StateError;

    fn try_from(raw: RawTopology) -> Result<Self, Self::Error> {
        Topology::new(raw.nodes, raw.edges, &raw.entry)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::construction_agency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_agency_is_valid() {
        let t = Topology::construction_agency();
        let rebuilt = Topology::new(t.nodes().to_vec(), t.edges().to_vec(), t.entry());
        assert!(rebuilt.is_ok());
        assert_eq!(t.nodes().len(), 6);
        assert_eq!(t.edges().len(), 12);
        assert!(t.nodes().iter().all(|n| n.status == NodeStatus::Idle));
        assert!(t.edges().iter().all(|e| !e.is_active() && !e.animated));
    }

    #[test]
    fn test_edge_to_unknown_node_rejected() {
        let nodes = vec![AgentNode::new("a", "A", "", AgentKind::Document)];
        let edges = vec![AgentEdge::new("a-b", "a", "b", EdgeKind::Data)];
        let err = Topology::new(nodes, edges, "a").unwrap_err();
        assert!(matches!(err, StateError::InvalidTopology(_)));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let nodes = vec![
            AgentNode::new("a", "A", "", AgentKind::Document),
            AgentNode::new("a", "A again", "", AgentKind::Cost),
        ];
        assert!(Topology::new(nodes, vec![], "a").is_err());
    }

    #[test]
    fn test_deserialize_round_trips_and_validates() {
        let t = Topology::construction_agency();
        let json = serde_json::to_string(&t).unwrap();
        let back: Topology = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["entry"] = serde_json::Value::String("ghost-agent".into());
        let err = serde_json::from_value::<Topology>(value).unwrap_err();
        assert!(err.to_string().contains("ghost-agent"));
    }

    #[test]
    fn test_unknown_entry_rejected() {
        let nodes = vec![AgentNode::new("a", "A", "", AgentKind::Document)];
        let err = Topology::new(nodes, vec![], "missing").unwrap_err();
        assert!(matches!(err, StateError::UnknownNode(_)));
    }
}

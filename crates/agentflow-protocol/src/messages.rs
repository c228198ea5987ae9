use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::FRONTEND_AGENT;
use crate::types::AgentId;
use crate::ProtocolError;

/// Chat message sent from the frontend to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message: String,
    pub source_agent: AgentId,
    pub target_agent: AgentId,
    /// Serialized as RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl OutboundMessage {
    /// A frontend-originated message stamped with the current time.
    pub fn new(message: &str, target_agent: &str) -> Self {
        Self {
            message: message.to_string(),
            source_agent: FRONTEND_AGENT.to_string(),
            target_agent: target_agent.to_string(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = None;
        self
    }

    /// JSON text frame for the transport.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

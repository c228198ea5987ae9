//! Chat transcript projection.
//!
//! Holds the ordered message list, the single in-flight stream buffer, the
//! "typing" flag and the last user-visible error. Messages are ordered by
//! append sequence (`seq`), never by timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agentflow_protocol::{AgentId, InboundEvent, MessageStatus, Role};

/// One immutable entry of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    /// Monotonic append position.
    pub seq: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

/// Assistant reply still being assembled from `stream` chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamBuffer {
    pub agent_id: AgentId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfacedErrorKind {
    /// A send was attempted without an open connection.
    NotConnected,
    /// The backend sent an `error` event.
    Backend,
    /// The transport rejected an outbound message.
    SendFailed,
}

/// Dismissible error shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfacedError {
    pub kind: SurfacedErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
}

impl SurfacedError {
    pub fn not_connected() -> Self {
        Self {
            kind: SurfacedErrorKind::NotConnected,
            message: "Not connected to the backend".to_string(),
            agent_id: None,
        }
    }

    pub fn send_failed(reason: &str) -> Self {
        Self {
            kind: SurfacedErrorKind::SendFailed,
            message: format!("Failed to send message: {reason}"),
            agent_id: None,
        }
    }

    pub fn backend(agent_id: &str, message: &str) -> Self {
        Self {
            kind: SurfacedErrorKind::Backend,
            message: message.to_string(),
            agent_id: Some(agent_id.to_string()),
        }
    }
}

#[derive(Debug, Default)]
pub struct TranscriptProjection {
    messages: Vec<ChatMessage>,
    stream: Option<StreamBuffer>,
    typing: bool,
    last_error: Option<SurfacedError>,
    next_seq: u64,
}

impl TranscriptProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn stream(&self) -> Option<&StreamBuffer> {
        self.stream.as_ref()
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn last_error(&self) -> Option<&SurfacedError> {
        self.last_error.as_ref()
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: &InboundEvent) {
        match event {
            InboundEvent::Stream { source, message } => self.append_stream(source, message),
            InboundEvent::Progress { .. } => {}
            InboundEvent::Response { .. } => {
                self.finalize_stream();
                self.typing = false;
            }
            InboundEvent::Error {
                source, message, ..
            } => {
                self.typing = false;
                self.last_error = Some(SurfacedError::backend(source, message));
            }
        }
    }

    /// Append a chunk for `agent_id`. A chunk from a different agent than
    /// the open buffer finalizes that buffer first.
    pub fn append_stream(&mut self, agent_id: &str, chunk: &str) {
        let switching = self
            .stream
            .as_ref()
            .map(|b| b.agent_id != agent_id)
            .unwrap_or(false);
        if switching {
            self.finalize_stream();
        }

        match &mut self.stream {
            Some(buffer) => buffer.text.push_str(chunk),
            None => {
                self.stream = Some(StreamBuffer {
                    agent_id: agent_id.to_string(),
                    text: chunk.to_string(),
                });
            }
        }
    }

    /// Flush the open buffer into an assistant message. An absent or empty
    /// buffer produces nothing.
    pub fn finalize_stream(&mut self) -> Option<&ChatMessage> {
        let buffer = self.stream.take()?;
        if buffer.text.is_empty() {
            return None;
        }
        tracing::debug!(agent = %buffer.agent_id, len = buffer.text.len(), "Finalized streamed reply");
        Some(self.push(Role::Assistant, buffer.text, None))
    }

    /// Drop the open buffer without producing a message.
    pub fn discard_stream(&mut self) {
        self.stream = None;
    }

    /// Optimistic local echo of user input.
    pub fn record_user_message(&mut self, text: &str) -> &ChatMessage {
        self.push(Role::User, text.to_string(), Some(MessageStatus::Sent))
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    pub fn surface_error(&mut self, error: SurfacedError) {
        self.last_error = Some(error);
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Empty the transcript, the buffer and the error.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.stream = None;
        self.last_error = None;
    }

    fn push(&mut self, role: Role, content: String, status: Option<MessageStatus>) -> &ChatMessage {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.messages.push(ChatMessage {
            id: Uuid::new_v4(),
            seq,
            role,
            content,
            timestamp: Utc::now(),
            status,
        });
        &self.messages[self.messages.len() - 1]
    }
}

//! Inbound event decoding.
//!
//! The backend sends JSON objects of the form
//! `{ "type", "source", "target"?, "data": { "message"?, "progress"?, "status"? } }`.
//! [`decode_event`] turns one raw payload into a typed [`InboundEvent`] exactly
//! once, at the boundary; everything downstream matches on the closed enum.
//! Unknown `type` values are tolerated so the backend can add event kinds
//! without breaking older frontends.

use serde::Deserialize;

use crate::constants::{MAX_PROGRESS, STATUS_COMPLETE};
use crate::types::AgentId;
use crate::ProtocolError;

const DEFAULT_ERROR_MESSAGE: &str = "Unknown backend error";

/// Status carried by a `response` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    /// The target agent finished its task.
    Complete,
    /// Any other status string reported by the backend.
    Other(String),
    /// No status field present.
    Unspecified,
}

impl ResponseStatus {
    fn from_wire(status: Option<String>) -> Self {
        match status {
            Some(s) if s == STATUS_COMPLETE => ResponseStatus::Complete,
            Some(s) => ResponseStatus::Other(s),
            None => ResponseStatus::Unspecified,
        }
    }
}

/// A decoded backend event.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Incremental chat text from an agent.
    Stream { source: AgentId, message: String },
    /// Work progress reported for `target`, flowing from `source`.
    Progress {
        source: AgentId,
        target: AgentId,
        message: Option<String>,
        progress: u8,
    },
    /// An agent finished replying (and possibly its task).
    Response {
        source: AgentId,
        target: Option<AgentId>,
        message: Option<String>,
        status: ResponseStatus,
    },
    /// The backend reported a failure.
    Error {
        source: AgentId,
        target: Option<AgentId>,
        message: String,
    },
}

impl InboundEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Stream { .. } => "stream",
            InboundEvent::Progress { .. } => "progress",
            InboundEvent::Response { .. } => "response",
            InboundEvent::Error { .. } => "error",
        }
    }

    pub fn source(&self) -> &str {
        match self {
            InboundEvent::Stream { source, .. }
            | InboundEvent::Progress { source, .. }
            | InboundEvent::Response { source, .. }
            | InboundEvent::Error { source, .. } => source,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            InboundEvent::Stream { .. } => None,
            InboundEvent::Progress { target, .. } => Some(target),
            InboundEvent::Response { target, .. } | InboundEvent::Error { target, .. } => {
                target.as_deref()
            }
        }
    }
}

/// Outcome of decoding one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(InboundEvent),
    /// Well-formed payload with a `type` this client does not know.
    Unknown { kind: String },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    data: Option<RawData>,
}

/// Older backends send `data` as a bare string instead of an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawData {
    Text(String),
    Fields(RawFields),
}

#[derive(Debug, Default, Deserialize)]
struct RawFields {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    status: Option<String>,
}

impl RawData {
    fn into_fields(self) -> RawFields {
        match self {
            RawData::Text(message) => RawFields {
                message: Some(message),
                ..Default::default()
            },
            RawData::Fields(fields) => fields,
        }
    }
}

/// Round and clamp a reported progress value onto 0..=100.
pub fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, MAX_PROGRESS as f64) as u8
}

/// Decode one raw inbound payload.
///
/// Fails with [`ProtocolError::MalformedPayload`] when the payload is not a
/// JSON object, lacks the `type` discriminator, or lacks a field its kind
/// requires. Unknown kinds are logged and returned as [`Decoded::Unknown`].
pub fn decode_event(raw: &str) -> Result<Decoded, ProtocolError> {
    let envelope: RawEnvelope = serde_json::from_str(raw)
        .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))?;

    let kind = envelope
        .kind
        .ok_or_else(|| ProtocolError::MalformedPayload("missing `type` field".into()))?;

    let known = matches!(kind.as_str(), "stream" | "progress" | "response" | "error");
    if !known {
        tracing::warn!(kind = %kind, "Ignoring inbound event of unknown type");
        return Ok(Decoded::Unknown { kind });
    }

    let source = envelope.source.ok_or_else(|| {
        ProtocolError::MalformedPayload(format!("`{kind}` event without `source`"))
    })?;
    let data = envelope.data.map(RawData::into_fields).unwrap_or_default();

    let event = match kind.as_str() {
        "stream" => {
            let message = data.message.ok_or_else(|| {
                ProtocolError::MalformedPayload("`stream` event without `data.message`".into())
            })?;
            InboundEvent::Stream { source, message }
        }
        "progress" => {
            let target = envelope.target.ok_or_else(|| {
                ProtocolError::MalformedPayload("`progress` event without `target`".into())
            })?;
            InboundEvent::Progress {
                source,
                target,
                message: data.message,
                progress: data.progress.map(clamp_progress).unwrap_or(0),
            }
        }
        "response" => InboundEvent::Response {
            source,
            target: envelope.target,
            message: data.message,
            status: ResponseStatus::from_wire(data.status),
        },
        _ => InboundEvent::Error {
            source,
            target: envelope.target,
            message: data
                .message
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
        },
    };

    Ok(Decoded::Event(event))
}

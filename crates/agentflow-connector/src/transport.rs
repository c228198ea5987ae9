//! Transport seam between the connection manager and the wire.
//!
//! A transport reports everything asynchronously through a channel of
//! [`TransportEvent`]s tagged with the generation passed to `connect`, so the
//! manager can tell a late event of a torn-down connection from a current
//! one.

use tokio::sync::mpsc;

use crate::ConnectorError;

/// Monotonic id of one connection attempt.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Opened,
    /// One inbound text frame.
    Message(String),
    Closed { reason: Option<String> },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub generation: Generation,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(generation: Generation, kind: TransportEventKind) -> Self {
        Self { generation, kind }
    }
}

pub trait Transport: Send {
    /// Begin connecting. Completion is reported later as `Opened` (or
    /// `Error` followed by `Closed`).
    fn connect(&mut self, endpoint: &str, generation: Generation) -> Result<(), ConnectorError>;

    /// Queue one text frame. Must not block.
    fn send(&mut self, text: String) -> Result<(), ConnectorError>;

    /// Tear down without reporting `Closed`.
    fn close(&mut self);
}

/// In-process transport used with the simulated backend. Connecting always
/// succeeds; outbound frames are recorded instead of transmitted.
pub struct LoopbackTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    connected: Option<Generation>,
    sent: Vec<String>,
}

impl LoopbackTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            connected: None,
            sent: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.is_some()
    }

    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Take the frames sent since the last call.
    pub fn drain_sent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sent)
    }

    /// Deliver `text` as if it had arrived on the current connection.
    pub fn inject(&self, text: String) -> Result<(), ConnectorError> {
        let generation = self.connected.ok_or(ConnectorError::NotConnected)?;
        self.emit(generation, TransportEventKind::Message(text));
        Ok(())
    }

    fn emit(&self, generation: Generation, kind: TransportEventKind) {
        if self.events.send(TransportEvent::new(generation, kind)).is_err() {
            tracing::debug!(generation, "Loopback event dropped, receiver gone");
        }
    }
}

impl Transport for LoopbackTransport {
    fn connect(&mut self, endpoint: &str, generation: Generation) -> Result<(), ConnectorError> {
        tracing::debug!(endpoint = %endpoint, generation, "Loopback transport connected");
        self.connected = Some(generation);
        self.emit(generation, TransportEventKind::Opened);
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), ConnectorError> {
        if self.connected.is_none() {
            return Err(ConnectorError::NotConnected);
        }
        self.sent.push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.connected = None;
    }
}

//! Live WebSocket transport.
//!
//! Each `connect` spawns one task that owns the socket. Outbound frames reach
//! it through an unbounded channel, so `send` never waits on the network.
//! Dropping that channel (on `close`) makes the task send a close frame and
//! exit quietly.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::transport::{Generation, Transport, TransportEvent, TransportEventKind};
use crate::ConnectorError;

pub struct WsTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl WsTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            outbound: None,
        }
    }
}

impl Transport for WsTransport {
    fn connect(&mut self, endpoint: &str, generation: Generation) -> Result<(), ConnectorError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        tokio::spawn(connection_task(
            endpoint.to_string(),
            generation,
            self.events.clone(),
            rx,
        ));
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), ConnectorError> {
        let outbound = self.outbound.as_ref().ok_or(ConnectorError::NotConnected)?;
        outbound
            .send(text)
            .map_err(|_| ConnectorError::Transport("connection task has exited".into()))
    }

    fn close(&mut self) {
        self.outbound = None;
    }
}

async fn connection_task(
    endpoint: String,
    generation: Generation,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let emit = |kind| {
        let _ = events.send(TransportEvent::new(generation, kind));
    };

    let ws = match connect_async(endpoint.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, generation, error = %e, "WebSocket connect failed");
            emit(TransportEventKind::Error(e.to_string()));
            emit(TransportEventKind::Closed {
                reason: Some(e.to_string()),
            });
            return;
        }
    };
    tracing::info!(endpoint = %endpoint, generation, "WebSocket connected");
    emit(TransportEventKind::Opened);

    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => emit(TransportEventKind::Message(text)),
                Some(Ok(Message::Close(close))) => {
                    let reason = close.map(|c| c.reason.to_string()).filter(|r| !r.is_empty());
                    emit(TransportEventKind::Closed { reason });
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(generation, error = %e, "WebSocket read failed");
                    emit(TransportEventKind::Error(e.to_string()));
                    emit(TransportEventKind::Closed {
                        reason: Some(e.to_string()),
                    });
                    break;
                }
                None => {
                    emit(TransportEventKind::Closed { reason: None });
                    break;
                }
            },
            text = outbound.recv() => match text {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        tracing::warn!(generation, error = %e, "WebSocket write failed");
                        emit(TransportEventKind::Error(e.to_string()));
                        emit(TransportEventKind::Closed {
                            reason: Some(e.to_string()),
                        });
                        break;
                    }
                }
                None => {
                    // Closed locally; the manager already moved on.
                    let _ = sink.send(Message::Close(None)).await;
                    tracing::debug!(generation, "WebSocket closed by client");
                    break;
                }
            },
        }
    }
}

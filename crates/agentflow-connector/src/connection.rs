//! Connection manager.
//!
//! Owns the single transport handle and the connection state published to
//! the UI. An unexpected closure schedules exactly one reconnection attempt
//! after a fixed delay; an explicit `close` cancels it. Transport events
//! carry the generation they were opened under, and anything from an older
//! generation is ignored.

use std::time::Duration;

use tokio::sync::watch;

use agentflow_protocol::{ConnectionState, RECONNECT_DELAY_SECS};

use crate::scheduler::{Scheduler, TimerFired, TimerId, TimerPurpose};
use crate::transport::{Generation, Transport, TransportEvent, TransportEventKind};
use crate::ConnectorError;

/// Reconnection schedule: a fixed interval, retried indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(RECONNECT_DELAY_SECS))
    }
}

/// What a transport event meant for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Nothing,
    Opened,
    Inbound(String),
    Lost,
}

pub struct ConnectionManager<T> {
    endpoint: String,
    transport: T,
    policy: RetryPolicy,
    state_tx: watch::Sender<ConnectionState>,
    generation: Generation,
    pending_reconnect: Option<TimerId>,
    reconnect_attempts: u32,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(endpoint: impl Into<String>, transport: T, policy: RetryPolicy) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            endpoint: endpoint.into(),
            transport,
            policy,
            state_tx,
            generation: 0,
            pending_reconnect: None,
            reconnect_attempts: 0,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn pending_reconnect(&self) -> Option<TimerId> {
        self.pending_reconnect
    }

    /// Reconnection timers that have fired since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Start connecting. A no-op while already open or connecting.
    pub fn open(&mut self, scheduler: &mut dyn Scheduler) -> Result<(), ConnectorError> {
        match self.state() {
            ConnectionState::Open | ConnectionState::Connecting => return Ok(()),
            ConnectionState::Disconnected | ConnectionState::Closing => {}
        }
        self.cancel_reconnect(scheduler);

        self.generation += 1;
        self.set_state(ConnectionState::Connecting);
        tracing::info!(endpoint = %self.endpoint, generation = self.generation, "Connecting");

        if let Err(e) = self.transport.connect(&self.endpoint, self.generation) {
            tracing::warn!(endpoint = %self.endpoint, error = %e, "Connect failed");
            self.set_state(ConnectionState::Disconnected);
            self.schedule_reconnect(scheduler);
            return Err(e);
        }
        Ok(())
    }

    /// Tear the connection down on purpose. No reconnection follows.
    pub fn close(&mut self, scheduler: &mut dyn Scheduler) {
        self.cancel_reconnect(scheduler);
        self.reconnect_attempts = 0;
        if self.state() == ConnectionState::Disconnected {
            return;
        }
        self.set_state(ConnectionState::Closing);
        self.transport.close();
        // Anything still in flight from the old socket is now stale.
        self.generation += 1;
        self.set_state(ConnectionState::Disconnected);
        tracing::info!(endpoint = %self.endpoint, "Connection closed");
    }

    pub fn send(&mut self, text: String) -> Result<(), ConnectorError> {
        if !self.is_open() {
            return Err(ConnectorError::NotConnected);
        }
        self.transport.send(text)
    }

    pub fn handle_event(
        &mut self,
        event: TransportEvent,
        scheduler: &mut dyn Scheduler,
    ) -> ConnectionUpdate {
        if event.generation != self.generation {
            tracing::trace!(
                event_generation = event.generation,
                current = self.generation,
                "Ignoring stale transport event"
            );
            return ConnectionUpdate::Nothing;
        }

        match event.kind {
            TransportEventKind::Opened => {
                if self.state() != ConnectionState::Connecting {
                    return ConnectionUpdate::Nothing;
                }
                self.reconnect_attempts = 0;
                self.set_state(ConnectionState::Open);
                tracing::info!(endpoint = %self.endpoint, generation = self.generation, "Connection open");
                ConnectionUpdate::Opened
            }
            TransportEventKind::Message(text) => {
                if self.is_open() {
                    ConnectionUpdate::Inbound(text)
                } else {
                    ConnectionUpdate::Nothing
                }
            }
            TransportEventKind::Error(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Transport error");
                ConnectionUpdate::Nothing
            }
            TransportEventKind::Closed { reason } => {
                let err = ConnectorError::TransportLost(
                    reason.unwrap_or_else(|| "closed by peer".to_string()),
                );
                tracing::warn!(
                    endpoint = %self.endpoint,
                    error = %err,
                    retry_in = ?self.policy.interval,
                    "Connection lost, scheduling reconnect"
                );
                self.transport.close();
                self.generation += 1;
                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect(scheduler);
                ConnectionUpdate::Lost
            }
        }
    }

    /// Returns true when `fired` was this manager's reconnect timer.
    pub fn on_timer(&mut self, fired: TimerFired, scheduler: &mut dyn Scheduler) -> bool {
        if fired.purpose != TimerPurpose::Reconnect || self.pending_reconnect != Some(fired.id) {
            return false;
        }
        self.pending_reconnect = None;
        self.reconnect_attempts += 1;
        tracing::info!(attempt = self.reconnect_attempts, "Reconnecting");
        if let Err(e) = self.open(scheduler) {
            tracing::debug!(error = %e, "Reconnect attempt failed");
        }
        true
    }

    fn schedule_reconnect(&mut self, scheduler: &mut dyn Scheduler) {
        if self.pending_reconnect.is_some() {
            return;
        }
        let id = scheduler.schedule(self.policy.interval, TimerPurpose::Reconnect);
        self.pending_reconnect = Some(id);
    }

    fn cancel_reconnect(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.pending_reconnect.take() {
            scheduler.cancel(id);
            tracing::debug!("Pending reconnect cancelled");
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        let prev = self.state_tx.send_replace(next);
        if prev != next {
            tracing::debug!(from = %prev, to = %next, "Connection state changed");
        }
    }
}

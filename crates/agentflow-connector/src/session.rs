//! Command dispatcher.
//!
//! A [`Session`] owns the synchronized state, the connection manager, the
//! scheduler and (in simulated mode) the scripted backend. It is the only
//! mutator: the runtime feeds it transport events, timer firings and user
//! commands one at a time.

use agentflow_protocol::{
    decode_event, ConnectionState, Decoded, OutboundMessage, ENTRY_AGENT, KICKOFF_MESSAGE,
};
use agentflow_state::{Snapshot, SurfacedError, SyncState, Topology};

use crate::config::ConnectorConfig;
use crate::connection::{ConnectionManager, ConnectionUpdate};
use crate::scheduler::{Scheduler, TimerFired, TimerPurpose};
use crate::simulation::Simulator;
use crate::transport::{Transport, TransportEvent};
use crate::ConnectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub entry_agent: String,
    pub kickoff_message: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            entry_agent: ENTRY_AGENT.to_string(),
            kickoff_message: KICKOFF_MESSAGE.to_string(),
        }
    }
}

impl From<&ConnectorConfig> for SessionSettings {
    fn from(config: &ConnectorConfig) -> Self {
        Self {
            entry_agent: config.entry_agent.clone(),
            kickoff_message: config.kickoff_message.clone(),
        }
    }
}

/// Result of one dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A frame was handed to the transport.
    Sent,
    /// Local state changed; nothing was sent.
    Applied,
    /// The command had no effect.
    Ignored,
    /// Rejected because the connection is not open.
    NotConnected,
    /// The outbound message will go out once the connection opens.
    Deferred,
    SendFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Transport(TransportEvent),
    Timer(TimerFired),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SendMessage(String),
    StartWorkflow,
    StopWorkflow,
    ResetWorkflow,
    ClearTranscript,
    DismissError,
    Connect,
    Disconnect,
    Shutdown,
}

pub struct Session<T, S> {
    settings: SessionSettings,
    state: SyncState,
    connection: ConnectionManager<T>,
    scheduler: S,
    simulator: Option<Simulator>,
    kickoff_pending: bool,
    malformed: u64,
    unknown: u64,
}

impl<T: Transport, S: Scheduler> Session<T, S> {
    pub fn new(
        settings: SessionSettings,
        topology: Topology,
        connection: ConnectionManager<T>,
        scheduler: S,
    ) -> Self {
        Self {
            settings,
            state: SyncState::new(topology),
            connection,
            scheduler,
            simulator: None,
            kickoff_pending: false,
            malformed: 0,
            unknown: 0,
        }
    }

    /// Drive inbound data from the scripted backend instead of the wire.
    pub fn with_simulator(mut self, simulator: Simulator) -> Self {
        self.simulator = Some(simulator);
        self
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut ConnectionManager<T> {
        &mut self.connection
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn simulator(&self) -> Option<&Simulator> {
        self.simulator.as_ref()
    }

    pub fn kickoff_pending(&self) -> bool {
        self.kickoff_pending
    }

    /// Payloads dropped because they failed to decode.
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    /// Payloads dropped because their kind is not understood.
    pub fn unknown_count(&self) -> u64 {
        self.unknown
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot(self.connection.state())
    }

    pub fn handle(&mut self, input: SessionInput) {
        match input {
            SessionInput::Transport(event) => {
                match self.connection.handle_event(event, &mut self.scheduler) {
                    ConnectionUpdate::Opened => {
                        if self.kickoff_pending {
                            self.send_kickoff();
                        }
                    }
                    ConnectionUpdate::Inbound(text) => self.ingest_raw(&text),
                    ConnectionUpdate::Lost | ConnectionUpdate::Nothing => {}
                }
            }
            SessionInput::Timer(fired) => match fired.purpose {
                TimerPurpose::Reconnect => {
                    self.connection.on_timer(fired, &mut self.scheduler);
                }
                TimerPurpose::SimulationStep => {
                    let payload = self
                        .simulator
                        .as_mut()
                        .and_then(|sim| sim.on_timer(fired.id, &mut self.scheduler));
                    if let Some(payload) = payload {
                        self.ingest_raw(&payload);
                    }
                }
            },
        }
    }

    /// Decode one raw payload and fan it out. Undecodable payloads are
    /// logged and dropped.
    pub fn ingest_raw(&mut self, raw: &str) {
        match decode_event(raw) {
            Ok(Decoded::Event(event)) => {
                tracing::debug!(kind = event.kind(), source = %event.source(), "Inbound event");
                self.state.ingest(event);
            }
            Ok(Decoded::Unknown { .. }) => self.unknown += 1,
            Err(e) => {
                self.malformed += 1;
                tracing::warn!(error = %e, "Dropping malformed payload");
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> DispatchOutcome {
        match command {
            Command::SendMessage(text) => self.send_message(&text),
            Command::StartWorkflow => self.start_workflow(),
            Command::StopWorkflow => {
                self.stop_workflow();
                DispatchOutcome::Applied
            }
            Command::ResetWorkflow => {
                self.reset_workflow();
                DispatchOutcome::Applied
            }
            Command::ClearTranscript => {
                self.clear_transcript();
                DispatchOutcome::Applied
            }
            Command::DismissError => {
                self.state.transcript.dismiss_error();
                DispatchOutcome::Applied
            }
            Command::Connect => match self.connect() {
                Ok(()) => DispatchOutcome::Applied,
                Err(_) => DispatchOutcome::NotConnected,
            },
            Command::Disconnect => {
                self.disconnect();
                DispatchOutcome::Applied
            }
            Command::Shutdown => {
                self.disconnect();
                DispatchOutcome::Applied
            }
        }
    }

    /// Send a chat message to the entry agent.
    pub fn send_message(&mut self, text: &str) -> DispatchOutcome {
        if text.trim().is_empty() {
            return DispatchOutcome::Ignored;
        }
        if !self.connection.is_open() {
            tracing::warn!(state = %self.connection.state(), "Message not sent, backend not connected");
            self.state.transcript.surface_error(SurfacedError::not_connected());
            return DispatchOutcome::NotConnected;
        }

        self.state.transcript.record_user_message(text);
        self.state.transcript.set_typing(true);
        self.state.transcript.dismiss_error();

        let target = self.settings.entry_agent.clone();
        if let Err(e) = self.transmit(text, &target) {
            self.state.transcript.set_typing(false);
            self.state
                .transcript
                .surface_error(SurfacedError::send_failed(&e.to_string()));
            return DispatchOutcome::SendFailed;
        }
        if let Some(sim) = self.simulator.as_mut() {
            sim.reply_to(text, &mut self.scheduler);
        }
        DispatchOutcome::Sent
    }

    /// Begin a run. Ignored while a run is already in progress.
    pub fn start_workflow(&mut self) -> DispatchOutcome {
        if self.state.workflow.is_running() {
            tracing::info!("Workflow run still in progress, start ignored; stop or reset first");
            return DispatchOutcome::Ignored;
        }
        self.state.start_run();
        self.kickoff_pending = true;

        if self.connection.is_open() {
            return self.send_kickoff();
        }
        if let Err(e) = self.connection.open(&mut self.scheduler) {
            tracing::warn!(error = %e, "Could not open connection for run, will retry");
        }
        DispatchOutcome::Deferred
    }

    pub fn stop_workflow(&mut self) {
        self.halt_activity();
        self.state.stop_run();
    }

    pub fn reset_workflow(&mut self) {
        self.halt_activity();
        self.state.reset_run();
    }

    pub fn clear_transcript(&mut self) {
        self.state.transcript.clear();
    }

    pub fn connect(&mut self) -> Result<(), ConnectorError> {
        self.connection.open(&mut self.scheduler)
    }

    pub fn disconnect(&mut self) {
        self.halt_activity();
    }

    /// The kickoff stays pending until a send succeeds, so a failure is
    /// retried on the next `Opened`.
    fn send_kickoff(&mut self) -> DispatchOutcome {
        let kickoff = self.settings.kickoff_message.clone();
        let target = self.settings.entry_agent.clone();
        if let Err(e) = self.transmit(&kickoff, &target) {
            self.state
                .transcript
                .surface_error(SurfacedError::send_failed(&e.to_string()));
            return DispatchOutcome::SendFailed;
        }
        self.kickoff_pending = false;
        tracing::info!(target = %target, "Kickoff sent");
        if let Some(sim) = self.simulator.as_mut() {
            sim.begin(&mut self.scheduler);
        }
        DispatchOutcome::Sent
    }

    fn transmit(&mut self, text: &str, target: &str) -> Result<(), ConnectorError> {
        let frame = OutboundMessage::new(text, target).encode()?;
        self.connection.send(frame).map_err(|e| {
            tracing::warn!(error = %e, target = %target, "Outbound send failed");
            e
        })
    }

    /// Close the connection and cancel every timer owned by the run.
    fn halt_activity(&mut self) {
        self.kickoff_pending = false;
        if let Some(sim) = self.simulator.as_mut() {
            sim.cancel(&mut self.scheduler);
        }
        self.connection.close(&mut self.scheduler);
    }
}

//! Event loop hosting one [`Session`].
//!
//! Transport events, timer firings and user commands each arrive on their
//! own channel and are handled strictly one at a time. After every input the
//! loop publishes a fresh [`Snapshot`] on a watch channel.

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use agentflow_protocol::ConnectionState;
use agentflow_state::{Snapshot, Topology};

use crate::config::{ConnectorConfig, DataSource};
use crate::connection::{ConnectionManager, RetryPolicy};
use crate::scheduler::{Scheduler, TimerFired, TokioScheduler};
use crate::session::{Command, Session, SessionInput, SessionSettings};
use crate::simulation::Simulator;
use crate::transport::{LoopbackTransport, Transport, TransportEvent};
use crate::ws_transport::WsTransport;
use crate::ConnectorError;

/// Client side of a running session loop.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    connection: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn send(&self, command: Command) -> Result<(), ConnectorError> {
        self.commands
            .send(command)
            .map_err(|_| ConnectorError::Transport("session loop has exited".into()))
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }

    /// Close the connection and wait for the loop to finish.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        // The loop may already be gone; joining reports that.
        let _ = self.commands.send(Command::Shutdown);
        self.task.await.context("session loop panicked")?;
        Ok(())
    }
}

/// Validate `config` and start a session loop on the current runtime.
pub fn spawn_session(config: &ConnectorConfig) -> anyhow::Result<SessionHandle> {
    config.validate().context("invalid connector configuration")?;

    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    let scheduler = TokioScheduler::new(timer_tx);
    let policy = RetryPolicy::fixed(config.reconnect_delay());
    let settings = SessionSettings::from(config);
    let topology = Topology::construction_agency();

    tracing::info!(
        endpoint = %config.endpoint,
        source = ?config.source,
        entry = %config.entry_agent,
        "Starting session"
    );

    let handle = match config.source {
        DataSource::Live => {
            let transport = WsTransport::new(transport_tx);
            let connection = ConnectionManager::new(config.endpoint.clone(), transport, policy);
            let session = Session::new(settings, topology, connection, scheduler);
            launch(session, transport_rx, timer_rx)
        }
        DataSource::Simulated => {
            let transport = LoopbackTransport::new(transport_tx);
            let connection = ConnectionManager::new(config.endpoint.clone(), transport, policy);
            let session = Session::new(settings, topology, connection, scheduler)
                .with_simulator(Simulator::new(config.step_interval()));
            launch(session, transport_rx, timer_rx)
        }
    };
    Ok(handle)
}

fn launch<T, S>(
    session: Session<T, S>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,
) -> SessionHandle
where
    T: Transport + 'static,
    S: Scheduler + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
    let connection_rx = session.connection().subscribe();
    let task = tokio::spawn(run_loop(
        session,
        transport_rx,
        timer_rx,
        command_rx,
        snapshot_tx,
    ));
    SessionHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        connection: connection_rx,
        task,
    }
}

async fn run_loop<T: Transport, S: Scheduler>(
    mut session: Session<T, S>,
    mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    mut timer_rx: mpsc::UnboundedReceiver<TimerFired>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    snapshot_tx: watch::Sender<Snapshot>,
) {
    loop {
        tokio::select! {
            Some(event) = transport_rx.recv() => session.handle(SessionInput::Transport(event)),
            Some(fired) = timer_rx.recv() => session.handle(SessionInput::Timer(fired)),
            command = command_rx.recv() => match command {
                Some(Command::Shutdown) | None => {
                    session.execute(Command::Shutdown);
                    snapshot_tx.send_replace(session.snapshot());
                    tracing::info!("Session loop stopped");
                    break;
                }
                Some(command) => {
                    let outcome = session.execute(command);
                    tracing::debug!(?outcome, "Command dispatched");
                }
            },
        }
        snapshot_tx.send_replace(session.snapshot());
    }
}

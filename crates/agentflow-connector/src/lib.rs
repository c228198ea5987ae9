//! agentflow Connector - live link to the workflow backend
//!
//! Owns the transport (with fixed-interval reconnection), routes inbound
//! payloads through the decoder into the projections, and turns user intents
//! into outbound protocol messages. Everything is driven from one event loop
//! (see [`runtime`]); timers go through the [`scheduler::Scheduler`] seam so
//! tests can drive time by hand.

pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod replay;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod simulation;
pub mod transport;
pub mod ws_transport;

pub use config::{ConnectorConfig, DataSource, SimulationConfig};
pub use connection::{ConnectionManager, ConnectionUpdate, RetryPolicy};
pub use error::ConnectorError;
pub use runtime::{spawn_session, SessionHandle};
pub use scheduler::{ManualScheduler, Scheduler, TimerFired, TimerId, TimerPurpose, TokioScheduler};
pub use session::{Command, DispatchOutcome, Session, SessionInput, SessionSettings};
pub use simulation::Simulator;
pub use transport::{Generation, LoopbackTransport, Transport, TransportEvent, TransportEventKind};
pub use ws_transport::WsTransport;

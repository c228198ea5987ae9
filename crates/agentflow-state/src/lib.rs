//! agentflow State - projections of the backend event stream
//!
//! Two independent reducers consume the same decoded events: the workflow
//! graph ([`WorkflowProjection`]) and the chat transcript
//! ([`TranscriptProjection`]). [`SyncState`] fans events out to both, keeps a
//! replayable log, and produces read-only [`Snapshot`]s for rendering.

pub mod error;
pub mod event_log;
pub mod node_machine;
pub mod presence;
pub mod store;
pub mod topology;
pub mod transcript;
pub mod workflow;

pub use error::StateError;
pub use event_log::{EventLog, LoggedEvent};
pub use node_machine::{NodeEvent, NodeStateMachine};
pub use presence::ActiveAgents;
pub use store::{Snapshot, SyncState};
pub use topology::{AgentEdge, AgentNode, Topology};
pub use transcript::{ChatMessage, StreamBuffer, SurfacedError, SurfacedErrorKind, TranscriptProjection};
pub use workflow::{RunPhase, WorkflowProjection};

//! Fan-out of decoded events to the independent projections.

use serde::{Deserialize, Serialize};

use agentflow_protocol::{AgentId, ConnectionState, InboundEvent};

use crate::event_log::EventLog;
use crate::presence::ActiveAgents;
use crate::topology::{AgentEdge, AgentNode, Topology};
use crate::transcript::{ChatMessage, StreamBuffer, SurfacedError, TranscriptProjection};
use crate::workflow::{RunPhase, WorkflowProjection};

/// Read-only view handed to rendering code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<AgentNode>,
    pub edges: Vec<AgentEdge>,
    pub messages: Vec<ChatMessage>,
    pub stream_buffer: Option<StreamBuffer>,
    pub typing: bool,
    pub connection: ConnectionState,
    pub last_error: Option<SurfacedError>,
    pub active_agents: Vec<AgentId>,
    pub run_phase: RunPhase,
}

/// The workflow graph, transcript and activity indicator over one event
/// stream. The projections never read each other; only this type routes
/// events and run commands to them.
#[derive(Default)]
pub struct SyncState {
    pub workflow: WorkflowProjection,
    pub transcript: TranscriptProjection,
    pub presence: ActiveAgents,
    log: EventLog,
}

impl SyncState {
    pub fn new(topology: Topology) -> Self {
        Self {
            workflow: WorkflowProjection::new(topology),
            transcript: TranscriptProjection::new(),
            presence: ActiveAgents::new(),
            log: EventLog::default(),
        }
    }

    /// Rebuild state by feeding a fixed event sequence from scratch.
    pub fn replay<I>(topology: Topology, events: I) -> Self
    where
        I: IntoIterator<Item = InboundEvent>,
    {
        let mut state = Self::new(topology);
        for event in events {
            state.ingest(event);
        }
        state
    }

    pub fn ingest(&mut self, event: InboundEvent) {
        self.workflow.apply(&event);
        self.transcript.apply(&event);
        self.presence.apply(&event);
        let seq = self.log.push(event);
        tracing::trace!(seq, "Event ingested");
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn start_run(&mut self) {
        self.workflow.start();
        self.presence.clear();
    }

    /// Freeze the run; a partially streamed reply is kept as a message.
    pub fn stop_run(&mut self) {
        self.workflow.stop();
        self.transcript.finalize_stream();
        self.transcript.set_typing(false);
        self.presence.clear();
    }

    /// Abandon the run; a partially streamed reply is dropped.
    pub fn reset_run(&mut self) {
        self.workflow.reset();
        self.transcript.discard_stream();
        self.transcript.set_typing(false);
        self.transcript.dismiss_error();
        self.presence.clear();
    }

    pub fn snapshot(&self, connection: ConnectionState) -> Snapshot {
        Snapshot {
            nodes: self.workflow.nodes().to_vec(),
            edges: self.workflow.edges().to_vec(),
            messages: self.transcript.messages().to_vec(),
            stream_buffer: self.transcript.stream().cloned(),
            typing: self.transcript.is_typing(),
            connection,
            last_error: self.transcript.last_error().cloned(),
            active_agents: self.presence.to_vec(),
            run_phase: self.workflow.phase(),
        }
    }
}

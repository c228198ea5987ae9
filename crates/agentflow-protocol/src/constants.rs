/// Default backend endpoint for the frontend socket.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/ws/frontend";

/// Environment variable that overrides the backend endpoint.
pub const ENDPOINT_ENV_VAR: &str = "AGENTFLOW_WEBSOCKET_URL";

/// Agent id the frontend uses as `source_agent` on every outbound message.
pub const FRONTEND_AGENT: &str = "frontend";

/// Agent that receives chat messages and the kickoff of a workflow run.
pub const ENTRY_AGENT: &str = "orchestration-agent";

/// Message sent to the entry agent when a run starts.
pub const KICKOFF_MESSAGE: &str = "Start construction project planning";

/// Fixed delay before a reconnection attempt after an unexpected close.
pub const RECONNECT_DELAY_SECS: u64 = 5;

/// Interval between steps of the simulated backend.
pub const SIMULATION_STEP_MS: u64 = 1_500;

/// Response status that marks a node as finished.
pub const STATUS_COMPLETE: &str = "complete";

/// Upper bound of the progress scale.
pub const MAX_PROGRESS: u8 = 100;

//! Line-based operator console.
//!
//! Lines starting with `/` are commands; anything else is a chat message for
//! the entry agent. Output is derived by diffing consecutive snapshots.

use agentflow_protocol::Role;
use agentflow_state::Snapshot;

use crate::session::Command;

pub const HELP: &[&str] = &[
    "Available commands:",
    "  <text>      - Send a chat message to the entry agent",
    "  /start      - Start a workflow run",
    "  /stop       - Stop the run (all agents complete)",
    "  /reset      - Reset the run (all agents idle)",
    "  /clear      - Clear the chat transcript",
    "  /dismiss    - Dismiss the current error",
    "  /connect    - Connect to the backend",
    "  /status     - Show connection and agent status",
    "  /help       - Show this help message",
    "  /quit       - Exit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(Command),
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConsoleInput::Empty;
    }
    if !trimmed.starts_with('/') {
        return ConsoleInput::Command(Command::SendMessage(trimmed.to_string()));
    }

    let command = trimmed.split_whitespace().next().unwrap_or(trimmed);
    match command {
        "/start" => ConsoleInput::Command(Command::StartWorkflow),
        "/stop" => ConsoleInput::Command(Command::StopWorkflow),
        "/reset" => ConsoleInput::Command(Command::ResetWorkflow),
        "/clear" => ConsoleInput::Command(Command::ClearTranscript),
        "/dismiss" => ConsoleInput::Command(Command::DismissError),
        "/connect" => ConsoleInput::Command(Command::Connect),
        "/status" => ConsoleInput::Status,
        "/help" => ConsoleInput::Help,
        "/quit" | "/exit" | "/q" => ConsoleInput::Quit,
        other => ConsoleInput::Unknown(other.to_string()),
    }
}

/// Human-readable lines for what changed between two snapshots.
pub fn describe_changes(prev: &Snapshot, next: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();

    if prev.connection != next.connection {
        lines.push(format!("[connection] {}", next.connection));
    }

    for node in &next.nodes {
        let before = prev.nodes.iter().find(|n| n.id == node.id);
        let changed = before
            .map(|b| b.status != node.status || b.progress != node.progress)
            .unwrap_or(true);
        if !changed {
            continue;
        }
        let mut line = format!("[agent] {} -> {}", node.name, node.status);
        if let Some(progress) = node.progress {
            line.push_str(&format!(" {progress}%"));
        }
        if let Some(task) = &node.current_task {
            line.push_str(&format!(" ({task})"));
        }
        if let Some(error) = &node.error {
            line.push_str(&format!(": {error}"));
        }
        lines.push(line);
    }

    let last_seen = prev.messages.last().map(|m| m.seq);
    for message in next
        .messages
        .iter()
        .filter(|m| last_seen.map(|seq| m.seq > seq).unwrap_or(true))
    {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "agent",
            Role::System => "system",
        };
        lines.push(format!("{who}> {}", message.content));
    }

    if next.typing && !prev.typing {
        lines.push("[typing...]".to_string());
    }

    if next.last_error != prev.last_error {
        if let Some(error) = &next.last_error {
            match &error.agent_id {
                Some(agent) => lines.push(format!("[error] {agent}: {}", error.message)),
                None => lines.push(format!("[error] {}", error.message)),
            }
        }
    }

    lines
}

pub fn describe_status(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = vec![format!(
        "Connection: {} | Run: {:?} | Messages: {}",
        snapshot.connection,
        snapshot.run_phase,
        snapshot.messages.len()
    )];
    for node in &snapshot.nodes {
        lines.push(format!("  {:<28} {}", node.name, node.status));
    }
    if !snapshot.active_agents.is_empty() {
        lines.push(format!("Active: {}", snapshot.active_agents.join(", ")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_protocol::{ConnectionState, InboundEvent};
    use agentflow_state::{SyncState, Topology};

    #[test]
    fn test_parse_commands_and_chat() {
        assert_eq!(parse_line("   "), ConsoleInput::Empty);
        assert_eq!(parse_line("/start"), ConsoleInput::Command(Command::StartWorkflow));
        assert_eq!(parse_line("/q"), ConsoleInput::Quit);
        assert_eq!(
            parse_line("  Start project  "),
            ConsoleInput::Command(Command::SendMessage("Start project".into()))
        );
        assert_eq!(parse_line("/bogus arg"), ConsoleInput::Unknown("/bogus".into()));
    }

    #[test]
    fn test_changes_list_new_messages_and_nodes() {
        let mut state = SyncState::new(Topology::construction_agency());
        let before = state.snapshot(ConnectionState::Disconnected);

        state.transcript.record_user_message("hello");
        state.ingest(InboundEvent::Progress {
            source: "orchestration-agent".into(),
            target: "cost-agent".into(),
            message: Some("Estimating".into()),
            progress: 30,
        });
        let after = state.snapshot(ConnectionState::Open);

        let lines = describe_changes(&before, &after);
        assert!(lines.contains(&"[connection] open".to_string()));
        assert!(lines.contains(&"you> hello".to_string()));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("[agent] Cost Analysis Agent -> processing 30%")));
        assert_eq!(describe_changes(&after, &after), Vec::<String>::new());
    }
}

//! Both projections fed from one fixed event sequence.

use agentflow_protocol::{decode_event, ConnectionState, Decoded, InboundEvent, NodeStatus, Role};
use agentflow_state::{RunPhase, SyncState, Topology};

fn decode(raw: &str) -> InboundEvent {
    match decode_event(raw).unwrap() {
        Decoded::Event(e) => e,
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_progress_scenario() {
    let state = SyncState::replay(
        Topology::default(),
        [decode(
            r#"{"type":"progress","source":"orchestration-agent","target":"document-agent",
                "data":{"message":"Drafting spec","progress":40}}"#,
        )],
    );
    let node = state.workflow.node("document-agent").unwrap();
    assert_eq!(node.status, NodeStatus::Processing);
    assert_eq!(node.progress, Some(40));
    assert!(state.workflow.edge("orchestration-doc").unwrap().is_active());
    assert!(state.presence.contains("orchestration-agent"));
}

#[test]
fn test_response_after_stream_scenario() {
    let state = SyncState::replay(
        Topology::default(),
        [
            decode(r#"{"type":"stream","source":"document-agent","data":{"message":"Draft..."}}"#),
            decode(
                r#"{"type":"response","source":"document-agent","target":"document-agent",
                    "data":{"message":"Done","status":"complete"}}"#,
            ),
        ],
    );

    let messages = state.transcript.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].content, "Draft...");
    assert!(state.transcript.stream().is_none());
    assert_eq!(state.workflow.node("document-agent").unwrap().status, NodeStatus::Complete);
}

#[test]
fn test_reset_postconditions_after_arbitrary_events() {
    let mut state = SyncState::default();
    state.start_run();
    for raw in [
        r#"{"type":"progress","source":"orchestration-agent","target":"document-agent","data":{"progress":10}}"#,
        r#"{"type":"stream","source":"document-agent","data":{"message":"partial"}}"#,
        r#"{"type":"progress","source":"document-agent","target":"cost-agent","data":{"progress":99}}"#,
        r#"{"type":"error","source":"cost-agent","data":{"message":"x"}}"#,
        r#"{"type":"stream","source":"cost-agent","data":{"message":"more"}}"#,
    ] {
        state.ingest(decode(raw));
    }
    state.reset_run();

    let snap = state.snapshot(ConnectionState::Disconnected);
    assert!(snap.nodes.iter().all(|n| n.status == NodeStatus::Idle));
    assert!(snap.edges.iter().all(|e| !e.is_active()));
    assert!(snap.stream_buffer.is_none());
    assert!(!snap.typing);
    assert!(snap.active_agents.is_empty());
    assert_eq!(snap.run_phase, RunPhase::Idle);
}

#[test]
fn test_stop_keeps_partial_reply() {
    let mut state = SyncState::default();
    state.start_run();
    state.ingest(decode(r#"{"type":"stream","source":"document-agent","data":{"message":"half a reply"}}"#));
    state.stop_run();

    assert_eq!(state.transcript.messages().len(), 1);
    assert_eq!(state.transcript.messages()[0].content, "half a reply");
    assert!(state.workflow.nodes().iter().all(|n| n.status == NodeStatus::Complete));
}

#[test]
fn test_log_replay_reproduces_projections() {
    let mut live = SyncState::default();
    for raw in [
        r#"{"type":"progress","source":"orchestration-agent","target":"document-agent","data":{"progress":10}}"#,
        r#"{"type":"stream","source":"document-agent","data":{"message":"Spec "}}"#,
        r#"{"type":"stream","source":"document-agent","data":{"message":"ready"}}"#,
        r#"{"type":"response","source":"document-agent","target":"document-agent","data":{"status":"complete"}}"#,
        r#"{"type":"progress","source":"document-agent","target":"technical-agent","data":{"progress":55}}"#,
    ] {
        live.ingest(decode(raw));
    }

    let replayed = SyncState::replay(Topology::default(), live.log().events());
    let a = live.snapshot(ConnectionState::Open);
    let b = replayed.snapshot(ConnectionState::Open);
    assert_eq!(a.nodes, b.nodes);
    assert_eq!(a.edges, b.edges);
    assert_eq!(a.active_agents, b.active_agents);
    let contents = |s: &agentflow_state::Snapshot| {
        s.messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>()
    };
    assert_eq!(contents(&a), contents(&b));
    assert_eq!(contents(&a), vec!["Spec ready".to_string()]);
}

#[test]
fn test_snapshot_serializes_for_ui() {
    let state = SyncState::default();
    let json = serde_json::to_value(state.snapshot(ConnectionState::Connecting)).unwrap();
    assert_eq!(json["connection"], "connecting");
    assert_eq!(json["nodes"].as_array().unwrap().len(), 6);
    assert_eq!(json["nodes"][0]["status"], "idle");
    assert_eq!(json["edges"][0]["kind"], "control");
}

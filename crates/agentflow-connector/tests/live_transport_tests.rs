//! End-to-end tests against an in-process WebSocket backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::{mpsc, Mutex};

use agentflow_connector::{
    spawn_session, Command, ConnectorConfig, DataSource, SessionHandle, Transport,
    TransportEventKind, WsTransport,
};
use agentflow_protocol::{ConnectionState, NodeStatus, KICKOFF_MESSAGE};
use agentflow_state::Snapshot;

const WAIT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct MockBackend {
    connections: AtomicUsize,
    close_first: bool,
    received: Mutex<Vec<String>>,
}

fn replies_to(frame: &str) -> Vec<String> {
    if !frame.contains(KICKOFF_MESSAGE) {
        return vec![];
    }
    vec![
        r#"{"type":"progress","source":"orchestration-agent","target":"document-agent","data":{"message":"Drafting","progress":50}}"#.to_string(),
        r#"{"type":"stream","source":"document-agent","data":{"message":"Draft..."}}"#.to_string(),
        r#"{"type":"response","source":"document-agent","target":"document-agent","data":{"message":"Done","status":"complete"}}"#.to_string(),
    ]
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(mock): State<Arc<MockBackend>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, mock))
}

async fn serve_socket(mut socket: WebSocket, mock: Arc<MockBackend>) {
    let n = mock.connections.fetch_add(1, Ordering::SeqCst);
    if mock.close_first && n == 0 {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Text(text) = message {
            mock.received.lock().await.push(text.clone());
            for reply in replies_to(&text) {
                if socket.send(Message::Text(reply)).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn start_backend(mock: Arc<MockBackend>) -> String {
    let app = Router::new()
        .route("/ws/frontend", get(ws_handler))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/ws/frontend")
}

fn live_config(endpoint: String) -> ConnectorConfig {
    ConnectorConfig {
        endpoint,
        reconnect_delay_secs: 1,
        ..ConnectorConfig::default()
    }
}

async fn wait_for<F>(handle: &SessionHandle, mut done: F) -> Snapshot
where
    F: FnMut(&Snapshot) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let snapshot = handle.snapshot();
            if done(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}

fn node_status(snapshot: &Snapshot, id: &str) -> NodeStatus {
    snapshot.nodes.iter().find(|n| n.id == id).unwrap().status
}

#[tokio::test]
async fn test_ws_transport_round_trip() {
    let mock = Arc::new(MockBackend::default());
    let endpoint = start_backend(mock.clone()).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = WsTransport::new(tx);
    transport.connect(&endpoint, 7).unwrap();

    let opened = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(opened.generation, 7);
    assert_eq!(opened.kind, TransportEventKind::Opened);

    let kickoff = format!(r#"{{"message":"{KICKOFF_MESSAGE}","source_agent":"frontend","target_agent":"orchestration-agent"}}"#);
    transport.send(kickoff.clone()).unwrap();

    let reply = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert!(matches!(reply.kind, TransportEventKind::Message(ref text) if text.contains("progress")));
    assert_eq!(mock.received.lock().await.as_slice(), [kickoff]);

    transport.close();
    assert!(transport.send("late".into()).is_err());
}

#[tokio::test]
async fn test_connect_failure_reports_closed() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = WsTransport::new(tx);
    // Nothing listens on port 1.
    transport.connect("ws://127.0.0.1:1/ws/frontend", 1).unwrap();

    let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert!(matches!(first.kind, TransportEventKind::Error(_)));
    let second = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert!(matches!(second.kind, TransportEventKind::Closed { .. }));
}

#[tokio::test]
async fn test_live_session_runs_workflow() {
    let mock = Arc::new(MockBackend::default());
    let endpoint = start_backend(mock.clone()).await;

    let handle = spawn_session(&live_config(endpoint)).unwrap();
    handle.send(Command::StartWorkflow).unwrap();

    let snapshot = wait_for(&handle, |s| {
        node_status(s, "document-agent") == NodeStatus::Complete && !s.messages.is_empty()
    })
    .await;

    assert_eq!(snapshot.connection, ConnectionState::Open);
    assert_eq!(node_status(&snapshot, "orchestration-agent"), NodeStatus::Processing);
    assert_eq!(snapshot.messages[0].content, "Draft...");
    assert!(snapshot
        .edges
        .iter()
        .find(|e| e.id == "orchestration-doc")
        .unwrap()
        .is_active());
    assert_eq!(mock.received.lock().await.len(), 1, "kickoff sent once");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_session_reconnects_after_server_close() {
    let mock = Arc::new(MockBackend {
        close_first: true,
        ..Default::default()
    });
    let endpoint = start_backend(mock.clone()).await;

    let handle = spawn_session(&live_config(endpoint)).unwrap();
    handle.send(Command::Connect).unwrap();

    wait_for(&handle, |s| {
        s.connection == ConnectionState::Open && mock.connections.load(Ordering::SeqCst) >= 2
    })
    .await;

    handle.send(Command::Disconnect).unwrap();
    let snapshot = wait_for(&handle, |s| s.connection == ConnectionState::Disconnected).await;
    assert_eq!(snapshot.connection, ConnectionState::Disconnected);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_simulated_session_completes_run() {
    let config = ConnectorConfig {
        source: DataSource::Simulated,
        simulation: agentflow_connector::SimulationConfig {
            step_interval_ms: 5,
        },
        ..ConnectorConfig::default()
    };
    let handle = spawn_session(&config).unwrap();
    handle.send(Command::StartWorkflow).unwrap();

    let snapshot = wait_for(&handle, |s| {
        s.nodes.iter().all(|n| n.status == NodeStatus::Complete)
    })
    .await;
    assert!(!snapshot.messages.is_empty());
    handle.shutdown().await.unwrap();
}

use agentflow_protocol::{decode_event, Decoded, InboundEvent, OutboundMessage, ProtocolError, ResponseStatus};

fn event(raw: &str) -> InboundEvent {
    match decode_event(raw).expect("payload should decode") {
        Decoded::Event(e) => e,
        other => panic!("expected a known event, got {other:?}"),
    }
}

#[test]
fn test_decode_progress() {
    let e = event(
        r#"{"type":"progress","source":"orchestration-agent","target":"document-agent",
            "data":{"message":"Drafting spec","progress":40}}"#,
    );
    assert_eq!(
        e,
        InboundEvent::Progress {
            source: "orchestration-agent".into(),
            target: "document-agent".into(),
            message: Some("Drafting spec".into()),
            progress: 40,
        }
    );
    assert_eq!(e.kind(), "progress");
    assert_eq!(e.target(), Some("document-agent"));
}

#[test]
fn test_decode_progress_clamps_out_of_range() {
    let e = event(r#"{"type":"progress","source":"a","target":"b","data":{"progress":180}}"#);
    assert!(matches!(e, InboundEvent::Progress { progress: 100, .. }));

    let e = event(r#"{"type":"progress","source":"a","target":"b","data":{"progress":-3}}"#);
    assert!(matches!(e, InboundEvent::Progress { progress: 0, .. }));
}

#[test]
fn test_decode_progress_without_value_defaults_to_zero() {
    let e = event(r#"{"type":"progress","source":"a","target":"b","data":{"message":"x"}}"#);
    assert!(matches!(e, InboundEvent::Progress { progress: 0, .. }));
}

#[test]
fn test_decode_response_complete() {
    let e = event(
        r#"{"type":"response","source":"document-agent","target":"document-agent",
            "data":{"message":"Done","status":"complete"}}"#,
    );
    match e {
        InboundEvent::Response { status, target, message, .. } => {
            assert_eq!(status, ResponseStatus::Complete);
            assert_eq!(target.as_deref(), Some("document-agent"));
            assert_eq!(message.as_deref(), Some("Done"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_decode_error_defaults_message() {
    let e = event(r#"{"type":"error","source":"cost-agent","data":{}}"#);
    match e {
        InboundEvent::Error { source, message, target } => {
            assert_eq!(source, "cost-agent");
            assert!(target.is_none());
            assert!(!message.is_empty(), "error events always carry display text");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_unknown_kind_is_tolerated() {
    let decoded = decode_event(r#"{"type":"heartbeat","source":"backend","data":{}}"#).unwrap();
    assert_eq!(decoded, Decoded::Unknown { kind: "heartbeat".into() });
}

#[test]
fn test_invalid_json_is_malformed() {
    let err = decode_event("{not json").unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPayload(_)));
}

#[test]
fn test_missing_type_is_malformed() {
    let err = decode_event(r#"{"source":"a","data":{"message":"x"}}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPayload(_)));
}

#[test]
fn test_missing_required_fields_are_malformed() {
    assert!(decode_event(r#"{"type":"stream","data":{"message":"x"}}"#).is_err());
    assert!(decode_event(r#"{"type":"stream","source":"a","data":{}}"#).is_err());
    assert!(decode_event(r#"{"type":"progress","source":"a","data":{"progress":1}}"#).is_err());
}

#[test]
fn test_non_object_payload_is_malformed() {
    assert!(decode_event("[1,2,3]").is_err());
    assert!(decode_event("\"stream\"").is_err());
}

#[test]
fn test_outbound_message_wire_shape() {
    let msg = OutboundMessage::new("Start project", "orchestration-agent");
    let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
    assert_eq!(value["message"], "Start project");
    assert_eq!(value["source_agent"], "frontend");
    assert_eq!(value["target_agent"], "orchestration-agent");
    let ts = value["timestamp"].as_str().expect("timestamp is a string");
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok(), "timestamp must be RFC 3339");

    let bare = msg.without_timestamp().encode().unwrap();
    assert!(!bare.contains("timestamp"));
}

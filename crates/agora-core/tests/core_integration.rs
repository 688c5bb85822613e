#![allow(clippy::unwrap_used, clippy::expect_used)]

use agora_core::*;
use std::time::Duration;

// ---------------------------------------------------------------------------
// 1. Message serialization keeps the envelope intact
// ---------------------------------------------------------------------------

#[test]
fn message_serialization_roundtrip() {
    let msg = Message::new(
        "security",
        "implementation",
        MessageKind::Recommendation,
        serde_json::json!({"advice": "rotate keys"}),
    )
    .with_priority(Priority::High);

    let json = serde_json::to_string(&msg).unwrap();
    let deserialized: Message = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized.id, msg.id);
    assert_eq!(deserialized.from, "security");
    assert_eq!(deserialized.to, Recipient::Agent("implementation".into()));
    assert_eq!(deserialized.kind, MessageKind::Recommendation);
    assert_eq!(deserialized.priority, Priority::High);
    assert_eq!(deserialized.timestamp, msg.timestamp);
    assert_eq!(deserialized.payload["advice"], "rotate keys");
}

#[test]
fn message_priority_defaults_when_missing() {
    let raw = serde_json::json!({
        "id": "6b0f2ad4-6a53-4b1c-9a4e-2f6c6f0f9d10",
        "from": "a1",
        "to": "broadcast",
        "kind": "alert",
        "timestamp": "2026-01-01T00:00:00Z"
    });
    let msg: Message = serde_json::from_value(raw).unwrap();
    assert_eq!(msg.priority, Priority::Medium);
    assert!(msg.payload.is_null());
    assert!(msg.is_broadcast());
}

// ---------------------------------------------------------------------------
// 2. Error Display and From impls
// ---------------------------------------------------------------------------

#[test]
fn error_display_and_from_impls() {
    let agent_err = AgoraError::Agent("execution crashed".to_string());
    assert_eq!(agent_err.to_string(), "Agent error: execution crashed");

    let unknown = AgoraError::UnknownRecipient("ghost".to_string());
    assert_eq!(unknown.to_string(), "Unknown recipient: ghost");

    let busy = AgoraError::AgentBusy {
        agent: "a1".to_string(),
        current_task: "T1".to_string(),
    };
    assert_eq!(busy.to_string(), "Agent a1 is busy with task T1");

    let timeout = AgoraError::Timeout(Duration::from_secs(2));
    assert_eq!(timeout.to_string(), "Timed out after 2s");

    let orchestrator_err = AgoraError::Orchestrator("blocked".to_string());
    assert_eq!(orchestrator_err.to_string(), "Orchestrator error: blocked");

    let bad_json = serde_json::from_str::<serde_json::Value>("not json");
    let agora_err: AgoraError = bad_json.unwrap_err().into();
    assert!(agora_err.to_string().starts_with("JSON error:"));

    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let agora_err: AgoraError = io_err.into();
    assert!(agora_err.to_string().starts_with("IO error:"));
}

// ---------------------------------------------------------------------------
// 3. Message kinds serialize to lowercase strings
// ---------------------------------------------------------------------------

#[test]
fn kind_serialization() {
    for (kind, name) in [
        (MessageKind::Task, "task"),
        (MessageKind::Result, "result"),
        (MessageKind::Question, "question"),
        (MessageKind::Recommendation, "recommendation"),
        (MessageKind::Alert, "alert"),
    ] {
        assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{name}\""));
        assert_eq!(kind.to_string(), name);
    }

    let bad: Result<MessageKind, _> = serde_json::from_str("\"gossip\"");
    assert!(bad.is_err());
}

#[test]
fn point_to_point_routing_predicate() {
    let msg = Message::new("a1", "a2", MessageKind::Task, serde_json::Value::Null);
    assert!(msg.is_for("a2"));
    assert!(!msg.is_for("a3"));
    assert!(!msg.is_for("a1"));
}

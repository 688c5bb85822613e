use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who a [`Message`] is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    /// Every registered agent except the sender.
    Broadcast,
    /// Exactly one agent, by id.
    Agent(String),
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Broadcast => write!(f, "*"),
            Recipient::Agent(id) => write!(f, "{id}"),
        }
    }
}

/// The kind tag carried by every [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A task hand-off.
    Task,
    /// The outcome of a completed task.
    Result,
    /// A collaboration request.
    Question,
    /// An answer or suggestion, usually in reply to a question.
    Recommendation,
    /// A conflict or failure notice.
    Alert,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Task => write!(f, "task"),
            MessageKind::Result => write!(f, "result"),
            MessageKind::Question => write!(f, "question"),
            MessageKind::Recommendation => write!(f, "recommendation"),
            MessageKind::Alert => write!(f, "alert"),
        }
    }
}

/// Message priority. Ordered from `Low` to `Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Informational.
    Low,
    /// The default.
    #[default]
    Medium,
    /// Needs attention soon.
    High,
    /// Needs attention now.
    Critical,
}

impl Priority {
    /// Parse a priority name, falling back to [`Priority::Medium`].
    pub fn parse_level(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "critical" => Priority::Critical,
            _ => Priority::Medium,
        }
    }
}

/// An addressed, immutable envelope exchanged between agents through the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// Id of the sending agent (or `"hub"` for hub-originated messages).
    pub from: String,
    /// Recipient of the message.
    pub to: Recipient,
    /// Kind tag.
    pub kind: MessageKind,
    /// Free-form payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// UTC timestamp of when the message was created.
    pub timestamp: DateTime<Utc>,
    /// Delivery priority.
    #[serde(default)]
    pub priority: Priority,
}

impl Message {
    /// Creates a point-to-point message with [`Priority::Medium`].
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(from.into(), Recipient::Agent(to.into()), kind, payload)
    }

    /// Creates a broadcast message with [`Priority::Medium`].
    pub fn broadcast(from: impl Into<String>, kind: MessageKind, payload: serde_json::Value) -> Self {
        Self::build(from.into(), Recipient::Broadcast, kind, payload)
    }

    fn build(from: String, to: Recipient, kind: MessageKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            kind,
            payload,
            timestamp: Utc::now(),
            priority: Priority::default(),
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Whether this message is addressed to everyone.
    pub fn is_broadcast(&self) -> bool {
        self.to == Recipient::Broadcast
    }

    /// Whether `agent_id` should receive this message.
    pub fn is_for(&self, agent_id: &str) -> bool {
        match &self.to {
            Recipient::Broadcast => self.from != agent_id,
            Recipient::Agent(id) => id == agent_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new("a1", "a2", MessageKind::Question, serde_json::json!("hi"));
        assert_eq!(msg.from, "a1");
        assert_eq!(msg.to, Recipient::Agent("a2".into()));
        assert_eq!(msg.priority, Priority::Medium);
        assert!(!msg.is_broadcast());
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let msg = Message::broadcast("a1", MessageKind::Alert, serde_json::Value::Null);
        assert!(msg.is_broadcast());
        assert!(!msg.is_for("a1"));
        assert!(msg.is_for("a2"));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Critical);
        assert_eq!(Priority::parse_level("CRITICAL"), Priority::Critical);
        assert_eq!(Priority::parse_level("whatever"), Priority::Medium);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&MessageKind::Recommendation).unwrap();
        assert_eq!(json, "\"recommendation\"");
        let to = serde_json::to_string(&Recipient::Broadcast).unwrap();
        assert_eq!(to, "\"broadcast\"");
    }
}

//! Chat message models
//!
//! Field names follow the backend's history format (`sender`, `text`, `type`,
//! `timestamp`). The spelled-out names (`content`, `kind`, `createdAt`) are
//! accepted on input as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    Status,
}

/// How a message body should be presented.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Json,
    Status,
}

/// Message body: plain text or an arbitrary structured answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Json(Value),
}

impl MessageContent {
    /// The body as a JSON value (text becomes a JSON string).
    pub fn to_json(&self) -> Value {
        match self {
            MessageContent::Text(s) => Value::String(s.clone()),
            MessageContent::Json(v) => v.clone(),
        }
    }

    /// Human-readable rendering. Structured bodies are pretty-printed.
    pub fn display_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Json(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
        }
    }
}

/// A single entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    #[serde(rename = "text", alias = "content")]
    pub content: MessageContent,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: MessageKind,
    #[serde(rename = "timestamp", alias = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: MessageContent::Text(text.into()),
            kind: MessageKind::Text,
            created_at: Utc::now(),
        }
    }

    /// A structured bot answer (or a structured error shaped like one).
    pub fn bot_json(value: Value) -> Self {
        Self {
            sender: Sender::Bot,
            content: MessageContent::Json(value),
            kind: MessageKind::Json,
            created_at: Utc::now(),
        }
    }

    /// A client-side progress or error notice.
    pub fn status(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Status,
            content: MessageContent::Text(text.into()),
            kind: MessageKind::Status,
            created_at: Utc::now(),
        }
    }

    /// Whether this message carries a structured body that can be exported.
    pub fn is_exportable(&self) -> bool {
        self.sender == Sender::Bot && self.kind == MessageKind::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_history_format() {
        let raw = json!({
            "sender": "user",
            "text": "What is the total?",
            "type": "text",
            "timestamp": "2025-03-01T10:00:00Z"
        });
        let msg: ChatMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(
            msg.content,
            MessageContent::Text("What is the total?".to_string())
        );
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.created_at.to_rfc3339(), "2025-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_decode_structured_body_with_aliases() {
        let raw = json!({
            "sender": "bot",
            "content": {"answers": ["42"]},
            "kind": "json",
            "createdAt": "2025-03-01T10:00:01.500Z"
        });
        let msg: ChatMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.sender, Sender::Bot);
        assert_eq!(msg.content, MessageContent::Json(json!({"answers": ["42"]})));
        assert!(msg.is_exportable());
    }

    #[test]
    fn test_missing_type_defaults_to_text() {
        let raw = json!({"sender": "status", "text": "Uploading..."});
        let msg: ChatMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
    }

    #[test]
    fn test_display_text_pretty_prints_json() {
        let content = MessageContent::Json(json!({"a": 1}));
        assert_eq!(content.display_text(), "{\n  \"a\": 1\n}");
        let text = MessageContent::Text("hi".to_string());
        assert_eq!(text.to_json(), json!("hi"));
    }

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(ChatMessage::status("x").kind, MessageKind::Status);
        assert_eq!(ChatMessage::user("x").sender, Sender::User);
        assert!(!ChatMessage::user("x").is_exportable());
    }
}

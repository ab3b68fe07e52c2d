//! Chat session models

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::ChatMessage;

/// One entry of the session history list (`GET /api/history`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// Sidebar label, e.g. "Chat from 2025-03-01 11:00".
    pub fn label(&self) -> String {
        match self.created_at {
            Some(ts) => format!(
                "Chat from {}",
                ts.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ),
            None => format!("Chat {}", self.session_id),
        }
    }
}

/// A full session as returned by `GET /api/history/{sessionId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_list_decodes() {
        let raw = json!([
            {"sessionId": "s1", "createdAt": "2025-03-01T10:00:00Z"},
            {"sessionId": "s2"}
        ]);
        let list: Vec<SessionSummary> = serde_json::from_value(raw).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].session_id, "s1");
        assert!(list[0].created_at.is_some());
        assert_eq!(list[1].label(), "Chat s2");
        assert!(list[0].label().starts_with("Chat from 2025-03-0"));
    }

    #[test]
    fn test_session_without_metadata() {
        let raw = json!({"messages": [{"sender": "user", "text": "hi"}]});
        let session: ChatSession = serde_json::from_value(raw).unwrap();
        assert_eq!(session.session_id, None);
        assert_eq!(session.messages.len(), 1);
    }
}

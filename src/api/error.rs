//! Error taxonomy for backend calls.
//!
//! Every response is decoded exactly once into `ApiResult<T>`; callers never
//! look at raw status codes or bodies.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No credential is stored locally.
    #[error("Not logged in. Run 'cognidoc login'.")]
    NotAuthenticated,

    /// HTTP 401 from the backend.
    #[error("401 Unauthorized for {url}. Token may be invalid -- run 'cognidoc login'.")]
    Unauthorized { url: String, message: Option<String> },

    /// Any other non-success status.
    #[error("HTTP {status} for {url}: {}", .message.as_deref().unwrap_or("(no message)"))]
    Server {
        url: String,
        status: u16,
        message: Option<String>,
    },

    /// The request never produced a response.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not have the expected shape.
    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

fn invalid_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)invalid token").expect("static regex"))
}

impl ApiError {
    /// Server-provided error text, if the backend sent any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message, .. } | ApiError::Server { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }

    /// Server text, or `fallback` when the backend gave none.
    pub fn message_or(&self, fallback: &str) -> String {
        self.message().unwrap_or(fallback).to_string()
    }

    /// Whether this failure means the credential is gone or no longer accepted.
    ///
    /// Not every failure path carries a 401, so the message text is checked
    /// for "invalid token" as well.
    pub fn is_session_expired(&self) -> bool {
        match self {
            ApiError::NotAuthenticated | ApiError::Unauthorized { .. } => true,
            _ => self
                .message()
                .is_some_and(|m| invalid_token_pattern().is_match(m)),
        }
    }
}

/// Pull the human-readable message out of an error body (`{error}` or
/// `{message}`). Non-JSON bodies yield `None`.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|m| !m.trim().is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(status: u16, message: Option<&str>) -> ApiError {
        ApiError::Server {
            url: "http://x/api/query".to_string(),
            status,
            message: message.map(String::from),
        }
    }

    #[test]
    fn test_unauthorized_is_expiry() {
        let err = ApiError::Unauthorized {
            url: "http://x".to_string(),
            message: None,
        };
        assert!(err.is_session_expired());
        assert!(ApiError::NotAuthenticated.is_session_expired());
    }

    #[test]
    fn test_invalid_token_message_is_expiry_any_case() {
        assert!(server(500, Some("Invalid Token")).is_session_expired());
        assert!(server(403, Some("jwt: INVALID TOKEN supplied")).is_session_expired());
        assert!(!server(500, Some("Document too large")).is_session_expired());
        assert!(!server(500, None).is_session_expired());
    }

    #[test]
    fn test_message_or_fallback() {
        assert_eq!(server(500, Some("boom")).message_or("Query failed"), "boom");
        assert_eq!(server(502, None).message_or("Query failed"), "Query failed");
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(r#"{"error":"Invalid token"}"#).as_deref(),
            Some("Invalid token")
        );
        assert_eq!(
            extract_message(r#"{"message":"User exists"}"#).as_deref(),
            Some("User exists")
        );
        assert_eq!(extract_message("<html>502</html>"), None);
        assert_eq!(extract_message(r#"{"error":""}"#), None);
    }
}

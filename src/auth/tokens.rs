//! Credential storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored bearer credential.
///
/// The token is opaque to the client. Whether it is still valid is only ever
/// learned from backend responses, so there is no local expiry check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub obtained_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(token: String) -> Self {
        Self {
            token,
            obtained_at: Utc::now(),
        }
    }
}

/// Token store trait for different storage backends
pub trait TokenStore {
    fn get_token(&self) -> Option<StoredToken>;
    fn set_token(&mut self, token: String);
    fn clear_token(&mut self);

    fn has_token(&self) -> bool {
        self.get_token().is_some()
    }
}

//! Login and registration endpoints (`POST /api/auth/{login|register}`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::DocClient;
use super::error::ApiResult;
use crate::auth::{AuthApi, AuthMode};

#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Either a token, or a message explaining why none was issued.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct AuthReply {
    pub token: Option<String>,
    pub message: Option<String>,
}

#[async_trait]
impl AuthApi for DocClient {
    async fn authenticate(
        &self,
        mode: AuthMode,
        credentials: &Credentials<'_>,
    ) -> ApiResult<AuthReply> {
        let path = format!("/api/auth/{}", mode.as_str());
        self.public_post(&path, credentials).await
    }
}

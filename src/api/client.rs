//! Authenticated HTTP client for the CogniDoc API
//!
//! Wraps reqwest::Client with bearer-token injection. The token can be swapped
//! at runtime (login, logout) without rebuilding the client.

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::RwLock;

use super::error::{extract_message, ApiError, ApiResult};
use crate::session::SessionStore;

pub struct DocClient {
    http: reqwest::Client,
    base: String,
    token: RwLock<Option<String>>,
}

impl DocClient {
    pub fn new(api_base: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: api_base.trim_end_matches('/').to_string(),
            token: RwLock::new(token),
        }
    }

    /// Client for the store's backend, carrying its current credential.
    pub fn from_store(store: &SessionStore) -> Self {
        Self::new(store.config().api_base(), store.credential())
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Replace (or drop) the credential used for subsequent requests.
    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }

    fn current_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Request builder carrying `Authorization: Bearer <token>`.
    pub(crate) fn authorized(
        &self,
        method: Method,
        path: &str,
    ) -> ApiResult<(String, RequestBuilder)> {
        let token = self.current_token().ok_or(ApiError::NotAuthenticated)?;
        let url = self.url(path);
        let builder = self.http.request(method, &url).bearer_auth(token);
        Ok((url, builder))
    }

    /// GET with bearer auth, decoding the JSON body.
    pub async fn authed_get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let (url, builder) = self.authorized(Method::GET, path)?;
        tracing::debug!("GET {}", url);
        let resp = send(builder, &url).await?;
        decode_json(resp, &url).await
    }

    /// POST a JSON body with bearer auth, decoding the JSON response.
    pub async fn authed_post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (url, builder) = self.authorized(Method::POST, path)?;
        tracing::debug!("POST {}", url);
        let resp = send(builder.json(body), &url).await?;
        decode_json(resp, &url).await
    }

    /// POST a multipart form with bearer auth, decoding the JSON response.
    pub async fn authed_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<T> {
        let (url, builder) = self.authorized(Method::POST, path)?;
        tracing::debug!("POST (multipart) {}", url);
        let resp = send(builder.multipart(form), &url).await?;
        decode_json(resp, &url).await
    }

    /// POST a JSON body without credentials (login/register).
    pub async fn public_post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        let resp = send(self.http.post(&url).json(body), &url).await?;
        decode_json(resp, &url).await
    }
}

async fn send(builder: RequestBuilder, url: &str) -> ApiResult<reqwest::Response> {
    let resp = builder.send().await.map_err(|source| ApiError::Transport {
        url: url.to_string(),
        source,
    })?;
    check_response(resp, url).await
}

/// Check HTTP response status code and decode the error body on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> ApiResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = extract_message(&body);
    tracing::debug!("HTTP {} for {}: {}", status.as_u16(), url, body);

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized {
            url: url.to_string(),
            message,
        });
    }
    Err(ApiError::Server {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> ApiResult<T> {
    let bytes = resp.bytes().await.map_err(|source| ApiError::Transport {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

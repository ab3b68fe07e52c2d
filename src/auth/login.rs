//! Email/password login and registration, logout and status

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::api::{ApiResult, AuthReply, Credentials, DocClient};
use crate::router::View;
use crate::session::SessionStore;

/// Which auth endpoint a submission goes to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Login => "login",
            AuthMode::Register => "register",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        }
    }
}

/// Backend seam for credential submission.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn authenticate(
        &self,
        mode: AuthMode,
        credentials: &Credentials<'_>,
    ) -> ApiResult<AuthReply>;
}

/// Why a submission did not produce a credential. The text is shown to the
/// user as-is.
#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("Please enter email and password.")]
    MissingFields,
    /// The backend answered without a token.
    #[error("{0}")]
    Rejected(String),
    /// The request failed; carries the server text or a generic fallback.
    #[error("{0}")]
    Failed(String),
    #[error("Failed to store credential: {0}")]
    Storage(String),
}

const AUTH_FAILED_FALLBACK: &str = "Authentication failed. Please try again.";

/// Local check before anything is sent. Returns the trimmed email.
pub fn validate<'a>(email: &'a str, password: &str) -> Result<&'a str, AuthError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingFields);
    }
    Ok(email)
}

/// Apply the backend's answer: adopt the token or explain why not.
pub fn adopt(store: &mut SessionStore, result: ApiResult<AuthReply>) -> Result<View, AuthError> {
    let reply = result.map_err(|e| {
        tracing::debug!("Auth request failed: {}", e);
        AuthError::Failed(e.message_or(AUTH_FAILED_FALLBACK))
    })?;

    match reply.token.filter(|t| !t.is_empty()) {
        Some(token) => {
            store
                .set_credential(token)
                .map_err(|e| AuthError::Storage(format!("{:#}", e)))?;
            Ok(View::Chat)
        }
        None => Err(AuthError::Rejected(
            reply
                .message
                .unwrap_or_else(|| AUTH_FAILED_FALLBACK.to_string()),
        )),
    }
}

/// Submit credentials. On success the token is adopted by `store` and the
/// caller should navigate to the returned view.
pub async fn submit(
    api: &dyn AuthApi,
    store: &mut SessionStore,
    email: &str,
    password: &str,
    mode: AuthMode,
) -> Result<View, AuthError> {
    let email = validate(email, password)?;
    tracing::info!("Submitting {} for {}", mode.as_str(), email);
    let result = api
        .authenticate(mode, &Credentials { email, password })
        .await;
    adopt(store, result)
}

/// CLI entry point for `cognidoc login`.
pub async fn login(
    store: &mut SessionStore,
    email: &str,
    password: &str,
    mode: AuthMode,
) -> Result<()> {
    let client = DocClient::from_store(store);
    match submit(&client, store, email, password, mode).await {
        Ok(_) => {
            println!("Login successful.");
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Clear stored credentials
pub fn logout(store: &mut SessionStore) -> Result<()> {
    store.clear_credential()?;
    println!("Logged out.");
    Ok(())
}

/// Display current auth status
pub fn status(store: &SessionStore) {
    match store.config().token.as_ref() {
        Some(token) => {
            println!("Credential:  present");
            println!(
                "  obtained:  {}",
                token.obtained_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        None => println!("Credential:  none"),
    }
    println!("Theme:       {}", store.theme());
    println!("API base:    {}", store.config().api_base());
    println!("Config file: {}", store.path().display());

    if !store.is_authenticated() {
        println!("\nRun 'cognidoc login' or 'cognidoc oauth' to authenticate.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::router::{resolve, Route};
    use std::sync::Mutex;

    /// Records submissions and answers with a canned result.
    struct FakeAuth {
        reply: Mutex<Option<ApiResult<AuthReply>>>,
        calls: Mutex<Vec<(AuthMode, String, String)>>,
    }

    impl FakeAuth {
        fn new(reply: ApiResult<AuthReply>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn authenticate(
            &self,
            mode: AuthMode,
            credentials: &Credentials<'_>,
        ) -> ApiResult<AuthReply> {
            self.calls.lock().unwrap().push((
                mode,
                credentials.email.to_string(),
                credentials.password.to_string(),
            ));
            self.reply.lock().unwrap().take().expect("single call")
        }
    }

    fn temp_store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("config.toml")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_login_adopts_token_and_opens_chat() {
        let (_dir, mut store) = temp_store();
        let api = FakeAuth::new(Ok(AuthReply {
            token: Some("t1".to_string()),
            message: None,
        }));

        let view = submit(&api, &mut store, "a@b.com", "x", AuthMode::Login)
            .await
            .unwrap();

        assert_eq!(view, View::Chat);
        assert_eq!(store.credential().as_deref(), Some("t1"));
        assert_eq!(resolve(&Route::Chat, store.is_authenticated()), View::Chat);
        assert_eq!(
            api.calls.lock().unwrap()[0],
            (AuthMode::Login, "a@b.com".to_string(), "x".to_string())
        );

        // Every later request carries the adopted credential.
        let client = DocClient::from_store(&store);
        let (_, builder) = client
            .authorized(reqwest::Method::POST, "/api/query")
            .unwrap();
        let request = builder.build().unwrap();
        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer t1"
        );
    }

    #[tokio::test]
    async fn test_empty_fields_skip_network() {
        let (_dir, mut store) = temp_store();
        let api = FakeAuth::new(Ok(AuthReply::default()));

        let err = submit(&api, &mut store, "  ", "x", AuthMode::Login)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::MissingFields);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reply_without_token_surfaces_message() {
        let (_dir, mut store) = temp_store();
        let api = FakeAuth::new(Ok(AuthReply {
            token: None,
            message: Some("User already exists".to_string()),
        }));

        let err = submit(&api, &mut store, "a@b.com", "x", AuthMode::Register)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already exists");
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_server_error_text_is_verbatim() {
        let (_dir, mut store) = temp_store();
        let api = FakeAuth::new(Err(ApiError::Unauthorized {
            url: "http://x/api/auth/login".to_string(),
            message: Some("Invalid credentials".to_string()),
        }));

        let err = submit(&api, &mut store, "a@b.com", "bad", AuthMode::Login)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Failed("Invalid credentials".to_string()));
    }

    #[tokio::test]
    async fn test_server_error_without_text_uses_fallback() {
        let (_dir, mut store) = temp_store();
        let api = FakeAuth::new(Err(ApiError::Server {
            url: "http://x/api/auth/login".to_string(),
            status: 502,
            message: None,
        }));

        let err = submit(&api, &mut store, "a@b.com", "x", AuthMode::Login)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), AUTH_FAILED_FALLBACK);
    }

    #[test]
    fn test_mode_toggle() {
        assert_eq!(AuthMode::Login.toggle(), AuthMode::Register);
        assert_eq!(AuthMode::Register.toggle().as_str(), "login");
    }
}

//! Google sign-in via backend redirect, plus the redirect handler
//!
//! The backend owns the whole OAuth exchange. We only send the browser to
//! `/api/auth/google?redirect_uri=...` and wait for it to come back to a local
//! callback carrying `?token=...`.

use anyhow::{bail, Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::future::IntoFuture;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::router::Route;
use crate::session::SessionStore;

/// Path of the local callback the backend redirects to.
pub const REDIRECT_PATH: &str = "/auth-redirect";

/// Result of consuming a callback URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Token adopted; continue to the chat view.
    Authenticated,
    /// No usable token; back to the auth view with this error.
    Failed(String),
}

impl RedirectOutcome {
    /// Where to navigate next.
    pub fn next_route(&self) -> Route {
        match self {
            RedirectOutcome::Authenticated => Route::Chat,
            RedirectOutcome::Failed(_) => Route::Login,
        }
    }
}

/// Local callback address handed to the backend.
pub fn callback_uri(port: u16) -> String {
    format!("http://127.0.0.1:{}{}", port, REDIRECT_PATH)
}

/// Authorization URL the browser must visit to start Google sign-in.
pub fn authorization_url(api_base: &str, redirect_uri: &str) -> Result<Url> {
    let mut url = Url::parse(&format!(
        "{}/api/auth/google",
        api_base.trim_end_matches('/')
    ))
    .context("Invalid API base URL")?;
    url.query_pairs_mut()
        .append_pair("redirect_uri", redirect_uri);
    Ok(url)
}

/// Consume a callback URL once: adopt the token if present.
pub fn handle_redirect(store: &mut SessionStore, callback: &Url) -> RedirectOutcome {
    let token = callback
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        tracing::warn!("OAuth callback without token");
        return RedirectOutcome::Failed("No authentication token found".to_string());
    };

    match store.set_credential(token) {
        Ok(()) => {
            tracing::info!("OAuth login completed");
            RedirectOutcome::Authenticated
        }
        Err(e) => {
            tracing::warn!("Failed to persist OAuth token: {:#}", e);
            RedirectOutcome::Failed("Failed to process authentication token".to_string())
        }
    }
}

/// Parse a pasted callback, accepting either a full URL or a bare path.
pub fn parse_callback(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    Url::parse(raw)
        .or_else(|_| Url::parse("http://127.0.0.1").and_then(|base| base.join(raw)))
        .with_context(|| format!("Not a callback URL: {}", raw))
}

/// Query string the backend appends to the callback.
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    token: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    /// Rebuild the callback URL the redirect handler consumes.
    fn to_url(&self) -> Result<Url> {
        let mut url = parse_callback(REDIRECT_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(token) = &self.token {
                query.append_pair("token", token);
            }
            if let Some(error) = &self.error {
                query.append_pair("error", error);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

async fn receive_callback(
    State(found): State<mpsc::Sender<Url>>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    let url = match params.to_url() {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Bad OAuth callback: {:#}", e);
            return (StatusCode::BAD_REQUEST, "Invalid sign-in callback.");
        }
    };
    // Capacity one: only the first callback is taken.
    match found.try_send(url) {
        Ok(()) => (
            StatusCode::OK,
            "Sign-in finished. You can close this window and return to the terminal.",
        ),
        Err(_) => (StatusCode::GONE, "Sign-in already handled."),
    }
}

/// Serve `/auth-redirect` on `listener` until the first callback arrives and
/// return its URL. Other paths get a 404.
pub async fn wait_for_callback(listener: TcpListener) -> Result<Url> {
    let (found_tx, mut found_rx) = mpsc::channel::<Url>(1);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route(REDIRECT_PATH, get(receive_callback))
        .with_state(found_tx);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.context("OAuth callback server failed")?;
            bail!("OAuth callback server stopped before the redirect arrived")
        }
        Some(url) = found_rx.recv() => {
            tracing::debug!("OAuth callback received");
            let _ = shutdown_tx.send(());
            server.await.context("OAuth callback server failed")?;
            Ok(url)
        }
    }
}

/// CLI entry point for `cognidoc oauth`.
pub async fn login(store: &mut SessionStore, pasted: Option<&str>) -> Result<()> {
    let callback = match pasted {
        Some(raw) => parse_callback(raw)?,
        None => {
            let port = store.config().oauth_port;
            let listener = TcpListener::bind(("127.0.0.1", port))
                .await
                .with_context(|| format!("Failed to listen on 127.0.0.1:{}", port))?;
            let url = authorization_url(store.config().api_base(), &callback_uri(port))?;

            println!();
            println!("To sign in with Google, visit:");
            println!("  {}", url);
            println!();
            tracing::info!("Waiting for OAuth redirect on port {}...", port);

            wait_for_callback(listener).await?
        }
    };

    match handle_redirect(store, &callback) {
        RedirectOutcome::Authenticated => {
            println!("Login successful.");
            Ok(())
        }
        RedirectOutcome::Failed(reason) => bail!("Error: {}", reason),
    }
}

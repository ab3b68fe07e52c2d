//! Async backend: bridges the TUI event loop with API calls.
//!
//! Uses an mpsc channel pair. The TUI sends `BackendCommand` values, and a
//! background tokio task executes them and sends `BackendResponse` values back.
//! Both travel stamped with the credential generation that issued the command,
//! so the TUI can drop answers meant for a user who has since logged out.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::api::{ApiResult, AuthReply, Credentials, DocClient, FileUpload, UploadReceipt};
use crate::auth::oauth::{authorization_url, callback_uri, wait_for_callback};
use crate::auth::{AuthApi, AuthMode};
use crate::chat::DocumentApi;
use crate::models::{ChatMessage, QueryRequest, QueryResponse, SessionSummary};

/// A command or response tagged with the credential generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    pub generation: u64,
    pub payload: T,
}

/// Commands sent from the TUI event loop to the async backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Swap the bearer credential used by later requests.
    SetCredential(Option<String>),
    Authenticate {
        mode: AuthMode,
        email: String,
        password: String,
    },
    /// Listen for the OAuth callback on `port` and report the sign-in URL.
    StartOAuth { port: u16 },
    /// Stop listening for the OAuth callback and free the port.
    CancelOAuth,
    UploadFile { path: PathBuf },
    UploadUrl { url: String },
    Query(QueryRequest),
    ListSessions,
    LoadSession { session_id: String },
}

/// Responses from the async backend to the TUI.
#[derive(Debug)]
pub enum BackendResponse {
    Authenticated(ApiResult<AuthReply>),
    OAuthUrl(Result<String, String>),
    OAuthCallback(Result<Url, String>),
    /// The local file could not be read; nothing was sent.
    FileUnreadable { path: PathBuf, error: String },
    FileUploaded(ApiResult<UploadReceipt>),
    UrlUploaded {
        url: String,
        result: ApiResult<UploadReceipt>,
    },
    Answered(ApiResult<QueryResponse>),
    Sessions(ApiResult<Vec<SessionSummary>>),
    SessionLoaded {
        session_id: String,
        result: ApiResult<Vec<ChatMessage>>,
    },
}

/// Handle for interacting with the backend from the TUI side.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<Stamped<BackendCommand>>,
    resp_rx: mpsc::UnboundedReceiver<Stamped<BackendResponse>>,
}

impl Backend {
    /// Spawn the backend task around `client`.
    pub fn start(client: DocClient) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(Arc::new(client), cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    /// Send a command to the backend (non-blocking).
    pub fn send(&self, cmd: Stamped<BackendCommand>) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }

    /// Next response. `None` once the backend task is gone.
    pub async fn recv(&mut self) -> Option<Stamped<BackendResponse>> {
        self.resp_rx.recv().await
    }
}

async fn backend_loop(
    client: Arc<DocClient>,
    mut cmd_rx: mpsc::UnboundedReceiver<Stamped<BackendCommand>>,
    resp_tx: mpsc::UnboundedSender<Stamped<BackendResponse>>,
) {
    let mut oauth_task: Option<JoinHandle<()>> = None;

    while let Some(Stamped {
        generation,
        payload: cmd,
    }) = cmd_rx.recv().await
    {
        // Credential swaps and listener control apply before any later
        // command is spawned.
        match cmd {
            BackendCommand::SetCredential(token) => {
                client.set_token(token);
                continue;
            }
            BackendCommand::CancelOAuth => {
                if let Some(task) = oauth_task.take() {
                    tracing::debug!("Cancelling OAuth listener");
                    task.abort();
                }
                continue;
            }
            BackendCommand::StartOAuth { port } => {
                if let Some(task) = oauth_task.take() {
                    task.abort();
                    // The aborted listener must release the port before rebinding.
                    let _ = task.await;
                }
                let client = Arc::clone(&client);
                let resp_tx = resp_tx.clone();
                oauth_task = Some(tokio::spawn(async move {
                    run_oauth(&client, port, generation, &resp_tx).await;
                }));
                continue;
            }
            _ => {}
        }

        let client = Arc::clone(&client);
        let resp_tx = resp_tx.clone();

        // Each request runs on its own task; answers arrive in completion order.
        tokio::spawn(async move {
            let response = match cmd {
                BackendCommand::SetCredential(_)
                | BackendCommand::CancelOAuth
                | BackendCommand::StartOAuth { .. } => return,
                BackendCommand::Authenticate {
                    mode,
                    email,
                    password,
                } => {
                    let credentials = Credentials {
                        email: &email,
                        password: &password,
                    };
                    BackendResponse::Authenticated(client.authenticate(mode, &credentials).await)
                }
                BackendCommand::UploadFile { path } => match FileUpload::read(&path).await {
                    Ok(file) => BackendResponse::FileUploaded(client.upload_file(&file).await),
                    Err(e) => BackendResponse::FileUnreadable {
                        path,
                        error: format!("{:#}", e),
                    },
                },
                BackendCommand::UploadUrl { url } => {
                    let result = client.upload_url(&url).await;
                    BackendResponse::UrlUploaded { url, result }
                }
                BackendCommand::Query(request) => {
                    BackendResponse::Answered(client.query(&request).await)
                }
                BackendCommand::ListSessions => {
                    BackendResponse::Sessions(client.list_sessions().await)
                }
                BackendCommand::LoadSession { session_id } => {
                    let result = DocumentApi::load_session(client.as_ref(), &session_id).await;
                    BackendResponse::SessionLoaded { session_id, result }
                }
            };
            let _ = resp_tx.send(Stamped {
                generation,
                payload: response,
            });
        });
    }
}

/// Bind the callback listener, publish the sign-in URL, then wait for the
/// browser to come back.
async fn run_oauth(
    client: &DocClient,
    port: u16,
    generation: u64,
    resp_tx: &mpsc::UnboundedSender<Stamped<BackendResponse>>,
) {
    let reply = |payload: BackendResponse| {
        let _ = resp_tx.send(Stamped {
            generation,
            payload,
        });
    };

    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(l) => l,
        Err(e) => {
            reply(BackendResponse::OAuthUrl(Err(format!(
                "Cannot listen on port {}: {}",
                port, e
            ))));
            return;
        }
    };

    match authorization_url(client.base_url(), &callback_uri(port)) {
        Ok(url) => {
            tracing::info!("Waiting for OAuth redirect on port {}", port);
            reply(BackendResponse::OAuthUrl(Ok(url.to_string())));
        }
        Err(e) => {
            reply(BackendResponse::OAuthUrl(Err(format!("{:#}", e))));
            return;
        }
    }

    let result = wait_for_callback(listener)
        .await
        .map_err(|e| format!("{:#}", e));
    reply(BackendResponse::OAuthCallback(result));
}

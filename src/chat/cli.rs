//! One-shot CLI commands over the chat view.

use anyhow::{bail, Result};
use std::path::Path;

use super::export::download_response;
use super::{ChatView, SessionExpired};
use crate::api::{DocClient, FileUpload};
use crate::models::{ChatMessage, Sender};
use crate::session::{logout_after, SessionStore, EXPIRY_LOGOUT_DELAY};

fn client(store: &SessionStore) -> Result<DocClient> {
    if !store.is_authenticated() {
        bail!("Not logged in. Run 'cognidoc login' or 'cognidoc oauth' first.");
    }
    Ok(DocClient::from_store(store))
}

/// Print messages appended since `from`.
fn print_from(view: &ChatView, from: usize) {
    for msg in view.messages.iter().skip(from) {
        print_message(msg);
    }
}

fn print_message(msg: &ChatMessage) {
    let who = match msg.sender {
        Sender::User => "You",
        Sender::Bot => "AI",
        Sender::Status => "--",
    };
    let time = msg.created_at.with_timezone(&chrono::Local).format("%H:%M");
    let body = msg.content.display_text();
    let mut lines = body.lines();
    println!("[{}] {}: {}", time, who, lines.next().unwrap_or(""));
    for line in lines {
        println!("    {}", line);
    }
}

/// Report the outcome of a chat operation. An expired session waits out the
/// notice delay and logs out before failing.
async fn settle(store: &mut SessionStore, outcome: Result<(), SessionExpired>) -> Result<()> {
    if let Err(expired) = outcome {
        logout_after(store, EXPIRY_LOGOUT_DELAY).await?;
        bail!("{}", expired);
    }
    Ok(())
}

pub async fn upload(store: &mut SessionStore, path: &Path) -> Result<()> {
    let api = client(store)?;
    let file = FileUpload::read(path).await?;
    let mut view = ChatView::new();

    let outcome = view.upload_file(&api, &file).await;
    print_from(&view, 0);
    settle(store, outcome).await
}

pub async fn fetch(store: &mut SessionStore, url: &str) -> Result<()> {
    let api = client(store)?;
    let mut view = ChatView::new();

    let outcome = view.upload_from_url(&api, url).await;
    print_from(&view, 0);
    settle(store, outcome).await
}

pub async fn ask(
    store: &mut SessionStore,
    text: &str,
    document: Option<String>,
    session: Option<String>,
    save: Option<&Path>,
) -> Result<()> {
    let api = client(store)?;
    let mut view = ChatView::new();
    view.set_document_url(document);
    view.current_session = session;

    let outcome = view.submit_query(&api, text).await;
    print_from(&view, 0);
    if let Some(id) = &view.current_session {
        println!("\nSession: {}", id);
    }
    settle(store, outcome).await?;

    if let Some(path) = save {
        match view.messages.last().filter(|m| m.is_exportable()) {
            Some(answer) => {
                let written = download_response(answer, Some(path))?;
                println!("Saved to {}", written.display());
            }
            None => bail!("No answer to save"),
        }
    }
    Ok(())
}

pub async fn history(store: &mut SessionStore) -> Result<()> {
    let api = client(store)?;
    let mut view = ChatView::new();
    view.refresh_sessions(&api).await;

    println!("\nChat sessions:");
    println!("{:-<60}", "");
    if view.sessions.is_empty() {
        println!("  (no sessions found)");
        return Ok(());
    }
    for session in &view.sessions {
        println!("{}", session.label());
        println!("  ID: {}", session.session_id);
    }
    Ok(())
}

pub async fn show(store: &mut SessionStore, session_id: &str) -> Result<()> {
    let api = client(store)?;
    let mut view = ChatView::new();

    let outcome = view.load_session(&api, session_id).await;
    if view.messages.is_empty() {
        println!("(no messages)");
    }
    print_from(&view, 0);
    settle(store, outcome).await
}

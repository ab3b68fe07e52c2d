//! TUI application state and main event loop

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::{FutureExt, StreamExt};
use ratatui::DefaultTerminal;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::{Duration, Instant};

use super::auth_form::AuthFormState;
use super::backend::{Backend, BackendCommand, BackendResponse, Stamped};
use super::debug_log::DebugLogState;
use super::input::TextInput;
use super::log_capture::LogBuffer;
use super::messages::MessagesState;
use super::prompt::{expand_home, PromptKind, PromptState};
use super::sidebar::{SidebarItem, SidebarState};
use super::ui;
use crate::api::DocClient;
use crate::auth::oauth::parse_callback;
use crate::auth::{handle_redirect, login, AuthError, RedirectOutcome};
use crate::chat::export::download_response;
use crate::chat::{ChatView, Followup};
use crate::router::{resolve, Route, View};
use crate::session::{SessionStore, EXPIRY_LOGOUT_DELAY};

/// Target frame rate for UI updates (~30 fps)
const FRAME_DURATION_MS: u64 = 33;

/// Active pane in the chat view
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pane {
    Sidebar,
    Messages,
    #[default]
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "history",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }

    fn prev(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Compose,
            Pane::Messages => Pane::Sidebar,
            Pane::Compose => Pane::Messages,
        }
    }
}

pub struct App {
    store: SessionStore,
    route: Route,
    pub should_exit: bool,
    pub active_pane: Pane,
    pub chat: ChatView,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: TextInput,
    pub auth: AuthFormState,
    pub prompt: PromptState,
    pub debug_log: DebugLogState,
    pub show_help: bool,
    pub status_message: Option<String>,
    pub status_is_error: bool,
    /// When set, the credential is dropped once this instant passes.
    logout_deadline: Option<Instant>,
    /// Session list already requested for the current credential.
    sessions_requested: bool,
    /// Waiting for the OAuth callback.
    oauth_waiting: bool,
    /// Bumped whenever the credential changes hands. Replies stamped with an
    /// older generation belong to a previous user and are dropped.
    generation: u64,
    /// Commands for the backend, flushed by the event loop.
    outbox: Vec<Stamped<BackendCommand>>,
}

impl App {
    pub fn new(store: SessionStore, log_buffer: LogBuffer, initial: Route) -> Self {
        let mut app = Self {
            store,
            route: Route::Home,
            should_exit: false,
            active_pane: Pane::default(),
            chat: ChatView::new(),
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: TextInput::default(),
            auth: AuthFormState::default(),
            prompt: PromptState::default(),
            debug_log: DebugLogState::new(log_buffer),
            show_help: false,
            status_message: None,
            status_is_error: false,
            logout_deadline: None,
            sessions_requested: false,
            oauth_waiting: false,
            generation: 0,
            outbox: Vec::new(),
        };
        app.navigate(initial);
        app
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The view for the current route, re-evaluated on every call.
    pub fn view(&self) -> View {
        resolve(&self.route, self.store.is_authenticated())
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn take_commands(&mut self) -> Vec<Stamped<BackendCommand>> {
        std::mem::take(&mut self.outbox)
    }

    fn send(&mut self, cmd: BackendCommand) {
        self.outbox.push(Stamped {
            generation: self.generation,
            payload: cmd,
        });
    }

    fn set_status(&mut self, msg: impl Into<String>, is_error: bool) {
        self.status_message = Some(msg.into());
        self.status_is_error = is_error;
    }

    fn clear_status(&mut self) {
        self.status_message = None;
        self.status_is_error = false;
    }

    fn navigate(&mut self, route: Route) {
        tracing::debug!("Navigate to {}", route.path());
        self.route = route;

        if let Route::AuthRedirect(callback) = &self.route {
            let outcome = match parse_callback(callback) {
                Ok(url) => handle_redirect(&mut self.store, &url),
                Err(_) => RedirectOutcome::Failed("No authentication token found".to_string()),
            };
            self.oauth_waiting = false;
            self.auth.oauth_url = None;
            match &outcome {
                RedirectOutcome::Authenticated => self.on_credential_adopted(),
                RedirectOutcome::Failed(reason) => self.auth.error = Some(reason.clone()),
            }
            self.route = outcome.next_route();
        }

        // Leaving the auth view frees the callback port.
        if self.oauth_waiting && self.view() != View::Auth {
            self.cancel_oauth();
        }
        self.enter_view();
    }

    /// Work that follows from landing on a view.
    fn enter_view(&mut self) {
        if self.view() == View::Chat && !self.sessions_requested {
            self.sessions_requested = true;
            self.send(BackendCommand::ListSessions);
        }
    }

    fn on_credential_adopted(&mut self) {
        self.generation += 1;
        self.logout_deadline = None;
        self.auth.reset();
        self.send(BackendCommand::SetCredential(self.store.credential()));
    }

    /// Drop the credential and every piece of per-user state.
    fn logout(&mut self) {
        if let Err(e) = self.store.clear_credential() {
            tracing::warn!("Failed to clear credential: {:#}", e);
        }
        self.generation += 1;
        self.logout_deadline = None;
        self.sessions_requested = false;
        self.chat = ChatView::new();
        self.sidebar = SidebarState::default();
        self.messages = MessagesState::default();
        self.compose.clear();
        self.prompt.close();
        self.send(BackendCommand::SetCredential(None));
    }

    fn apply_followups(&mut self, followups: Vec<Followup>) {
        for followup in followups {
            match followup {
                Followup::RefreshSessions => self.send(BackendCommand::ListSessions),
                Followup::ExpireSession => {
                    if self.logout_deadline.is_none() {
                        self.logout_deadline = Some(Instant::now() + EXPIRY_LOGOUT_DELAY);
                    }
                }
            }
        }
        self.messages.follow(self.chat.messages.len());
    }

    /// Periodic housekeeping: the forced logout after an expired session.
    pub fn tick(&mut self, now: Instant) {
        if self.logout_deadline.is_some_and(|deadline| now >= deadline) {
            tracing::info!("Session expired, logging out");
            self.logout();
        }
    }

    // -- keyboard --

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return;
        }
        if self.show_help {
            self.show_help = false;
            return;
        }
        if self.prompt.is_open() {
            self.handle_prompt_key(key);
            return;
        }
        if key.code == KeyCode::F(1) {
            self.show_help = true;
            return;
        }

        if ctrl {
            match key.code {
                KeyCode::Char('t') => {
                    self.toggle_theme();
                    return;
                }
                KeyCode::Char('d') => {
                    self.debug_log.toggle();
                    return;
                }
                KeyCode::Char('x') if self.is_authenticated() => {
                    self.logout();
                    self.navigate(Route::Login);
                    self.set_status("Logged out.", false);
                    return;
                }
                _ => {}
            }
        }
        if self.debug_log.visible {
            match key.code {
                KeyCode::PageUp => {
                    self.debug_log.scroll_up(5);
                    return;
                }
                KeyCode::PageDown => {
                    self.debug_log.scroll_down(5);
                    return;
                }
                _ => {}
            }
        }

        match self.view() {
            View::Home => self.handle_home_key(key),
            View::Auth | View::AuthRedirect => self.handle_auth_key(key),
            View::Chat => self.handle_chat_key(key),
        }
    }

    fn toggle_theme(&mut self) {
        match self.store.toggle_theme() {
            Ok(theme) => self.set_status(format!("Theme: {}", theme), false),
            Err(e) => self.set_status(format!("Failed to save theme: {:#}", e), true),
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.navigate(Route::Chat),
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('r') if ctrl => self.auth.toggle_mode(),
            KeyCode::Char('g') if ctrl => self.start_oauth(),
            KeyCode::Char('u') if ctrl => self.auth.focused_input().clear(),
            KeyCode::Esc => self.navigate(Route::Home),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.auth.switch_field()
            }
            KeyCode::Enter => self.submit_auth(),
            KeyCode::Char(c) if !ctrl => self.auth.focused_input().insert_char(c),
            KeyCode::Backspace => self.auth.focused_input().backspace(),
            KeyCode::Delete => self.auth.focused_input().delete(),
            KeyCode::Left => self.auth.focused_input().move_left(),
            KeyCode::Right => self.auth.focused_input().move_right(),
            KeyCode::Home => self.auth.focused_input().move_home(),
            KeyCode::End => self.auth.focused_input().move_end(),
            _ => {}
        }
    }

    fn submit_auth(&mut self) {
        if self.auth.submitting {
            return;
        }
        let email = match login::validate(self.auth.email.value(), self.auth.password.value()) {
            Ok(email) => email.to_string(),
            Err(e) => {
                self.auth.error = Some(e.to_string());
                return;
            }
        };
        tracing::info!("Submitting {} for {}", self.auth.mode.as_str(), email);
        self.auth.error = None;
        self.auth.submitting = true;
        let cmd = BackendCommand::Authenticate {
            mode: self.auth.mode,
            email,
            password: self.auth.password.value().to_string(),
        };
        self.send(cmd);
    }

    fn start_oauth(&mut self) {
        if self.oauth_waiting {
            return;
        }
        self.oauth_waiting = true;
        self.auth.error = None;
        let port = self.store.config().oauth_port;
        self.send(BackendCommand::StartOAuth { port });
    }

    fn cancel_oauth(&mut self) {
        self.oauth_waiting = false;
        self.auth.oauth_url = None;
        self.send(BackendCommand::CancelOAuth);
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl {
            match key.code {
                KeyCode::Char('n') => return self.new_chat(),
                KeyCode::Char('o') => return self.prompt.open(PromptKind::UploadFile, None),
                KeyCode::Char('l') => {
                    let current = self.chat.document_url.clone();
                    return self.prompt.open(PromptKind::DocumentUrl, current.as_deref());
                }
                KeyCode::Char('f') => {
                    let current = self.chat.document_url.clone();
                    return self.prompt.open(PromptKind::FetchUrl, current.as_deref());
                }
                _ => {}
            }
        }
        match key.code {
            KeyCode::Tab => {
                self.active_pane = self.active_pane.next();
                return;
            }
            KeyCode::BackTab => {
                self.active_pane = self.active_pane.prev();
                return;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key),
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(&self.chat.sessions),
            KeyCode::Enter => match self.sidebar.item(&self.chat.sessions) {
                SidebarItem::NewChat => self.new_chat(),
                SidebarItem::Session(i) => {
                    let session_id = self.chat.sessions[i].session_id.clone();
                    self.set_status("Loading chat...", false);
                    self.send(BackendCommand::LoadSession { session_id });
                }
            },
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.messages.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.messages.select_next(self.chat.messages.len())
            }
            KeyCode::Home => self.messages.selected = 0,
            KeyCode::End => self.messages.follow(self.chat.messages.len()),
            KeyCode::Char('s') => self.save_selected(None),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Enter if alt => self.compose.insert_newline(),
            KeyCode::Enter => self.submit_query(),
            KeyCode::Char('u') if ctrl => self.compose.clear(),
            KeyCode::Char(c) if !ctrl => self.compose.insert_char(c),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Delete => self.compose.delete(),
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.prompt.close(),
            KeyCode::Enter => {
                if let Some((kind, value)) = self.prompt.submit() {
                    self.submit_prompt(kind, value);
                }
            }
            KeyCode::Char('u') if ctrl => self.prompt.input.clear(),
            KeyCode::Char(c) if !ctrl => self.prompt.input.insert_char(c),
            KeyCode::Backspace => self.prompt.input.backspace(),
            KeyCode::Delete => self.prompt.input.delete(),
            KeyCode::Left => self.prompt.input.move_left(),
            KeyCode::Right => self.prompt.input.move_right(),
            KeyCode::Home => self.prompt.input.move_home(),
            KeyCode::End => self.prompt.input.move_end(),
            _ => {}
        }
    }

    // -- chat actions --

    fn submit_query(&mut self) {
        if self.chat.pending {
            self.set_status("Waiting for the current answer...", false);
            return;
        }
        let text = self.compose.take();
        if let Some(request) = self.chat.begin_query(&text) {
            self.send(BackendCommand::Query(request));
        }
        self.messages.follow(self.chat.messages.len());
    }

    fn new_chat(&mut self) {
        let followups = self.chat.start_new_chat();
        self.sidebar.selected = 0;
        self.apply_followups(followups);
        self.set_status("Started a new chat.", false);
    }

    fn submit_prompt(&mut self, kind: PromptKind, value: String) {
        match kind {
            PromptKind::UploadFile => {
                if value.is_empty() {
                    return;
                }
                let path = expand_home(&value);
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| value.clone());
                self.chat.begin_upload_file(&name);
                self.send(BackendCommand::UploadFile { path });
            }
            PromptKind::DocumentUrl => {
                self.chat.set_document_url(Some(value));
                match &self.chat.document_url {
                    Some(url) => self.set_status(format!("Questions will use {}", url), false),
                    None => self.set_status("Document URL cleared.", false),
                }
            }
            PromptKind::FetchUrl => {
                if let Some(url) = self.chat.begin_upload_url(&value) {
                    self.send(BackendCommand::UploadUrl { url });
                }
            }
        }
        self.messages.follow(self.chat.messages.len());
    }

    fn save_selected(&mut self, path: Option<&Path>) {
        let Some(message) = self.messages.selected_message(&self.chat) else {
            return;
        };
        if !message.is_exportable() {
            self.set_status("Select an AI answer to save it.", true);
            return;
        }
        match download_response(message, path) {
            Ok(written) => self.set_status(format!("Saved to {}", written.display()), false),
            Err(e) => self.set_status(format!("{:#}", e), true),
        }
    }

    // -- backend responses --

    /// Apply a backend reply unless it was issued under an earlier credential.
    pub fn handle_reply(&mut self, reply: Stamped<BackendResponse>) {
        if reply.generation != self.generation {
            tracing::debug!(
                "Dropping reply from credential generation {} (now {})",
                reply.generation,
                self.generation
            );
            return;
        }
        self.handle_response(reply.payload);
    }

    fn handle_response(&mut self, resp: BackendResponse) {
        match resp {
            BackendResponse::Authenticated(result) => {
                self.auth.submitting = false;
                match login::adopt(&mut self.store, result) {
                    Ok(view) => {
                        self.on_credential_adopted();
                        self.clear_status();
                        if view == View::Chat {
                            self.navigate(Route::Chat);
                        }
                    }
                    Err(AuthError::MissingFields) => {}
                    Err(e) => self.auth.error = Some(e.to_string()),
                }
            }
            BackendResponse::OAuthUrl(_) | BackendResponse::OAuthCallback(_)
                if !self.oauth_waiting =>
            {
                tracing::debug!("Ignoring OAuth reply after cancel");
            }
            BackendResponse::OAuthUrl(Ok(url)) => self.auth.oauth_url = Some(url),
            BackendResponse::OAuthUrl(Err(e)) | BackendResponse::OAuthCallback(Err(e)) => {
                self.oauth_waiting = false;
                self.auth.oauth_url = None;
                self.auth.error = Some(e);
            }
            BackendResponse::OAuthCallback(Ok(url)) => {
                self.navigate(Route::AuthRedirect(url.to_string()));
            }
            BackendResponse::FileUnreadable { path, error } => {
                tracing::warn!("Cannot read {}: {}", path.display(), error);
                self.chat
                    .messages
                    .push(crate::models::ChatMessage::status(format!("[error] {}", error)));
                self.messages.follow(self.chat.messages.len());
            }
            BackendResponse::FileUploaded(result) => {
                let followups = self.chat.finish_upload_file(result);
                self.apply_followups(followups);
            }
            BackendResponse::UrlUploaded { url, result } => {
                let followups = self.chat.finish_upload_url(&url, result);
                self.apply_followups(followups);
            }
            BackendResponse::Answered(result) => {
                let followups = self.chat.finish_query(result);
                self.apply_followups(followups);
            }
            BackendResponse::Sessions(result) => {
                self.chat.apply_sessions(result);
                self.sidebar.clamp_selection(&self.chat.sessions);
            }
            BackendResponse::SessionLoaded { session_id, result } => {
                self.clear_status();
                let followups = self.chat.finish_load_session(&session_id, result);
                self.apply_followups(followups);
            }
        }
    }
}

/// Run the TUI with panic-safe terminal restore
pub async fn run(store: SessionStore, log_buffer: LogBuffer, initial: Route) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = AssertUnwindSafe(run_app(&mut terminal, store, log_buffer, initial))
        .catch_unwind()
        .await;
    ratatui::restore();

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    store: SessionStore,
    log_buffer: LogBuffer,
    initial: Route,
) -> Result<()> {
    let mut backend = Backend::start(DocClient::from_store(&store));
    let mut app = App::new(store, log_buffer, initial);
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(FRAME_DURATION_MS));

    while !app.should_exit {
        for cmd in app.take_commands() {
            backend.send(cmd);
        }
        app.debug_log.refresh();
        terminal.draw(|frame| ui::render(frame, &app))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(reply) = backend.recv() => app.handle_reply(reply),
            _ = tick.tick() => app.tick(Instant::now()),
        }
    }

    Ok(())
}

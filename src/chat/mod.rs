//! Chat view state: messages, pending flag, document URL, session history.
//!
//! Each operation has a synchronous `begin_*` half (local validation and the
//! messages appended before the request goes out) and a `finish_*` half that
//! applies the backend result. The TUI sends the request itself in between;
//! the async wrappers below do all three steps for the one-shot CLI commands.
//!
//! The message list is only mutated from these methods, which the owner calls
//! from a single task, so appends land in completion order.

pub mod cli;
pub mod export;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;

use crate::api::{ApiError, ApiResult, FileUpload, UploadReceipt};
use crate::models::{ChatMessage, QueryRequest, QueryResponse, SessionSummary};

pub const EXPIRED_NOTICE: &str = "Session expired. Please log in again.";
pub const INVALID_URL_NOTICE: &str = "Please enter a valid .pdf, .docx, or .eml URL";
pub const LOAD_FAILED_NOTICE: &str = "Failed to load chat session.";
const UPLOAD_FALLBACK: &str = "Upload failed";
const URL_UPLOAD_FALLBACK: &str = "URL upload failed";
const QUERY_FALLBACK: &str = "Query failed";
const QUERY_FAILED_TITLE: &str = "Query Failed";

/// Backend seam for everything the chat view sends.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn upload_file(&self, file: &FileUpload) -> ApiResult<UploadReceipt>;
    async fn upload_url(&self, url: &str) -> ApiResult<UploadReceipt>;
    async fn query(&self, request: &QueryRequest) -> ApiResult<QueryResponse>;
    async fn list_sessions(&self) -> ApiResult<Vec<SessionSummary>>;
    async fn load_session(&self, session_id: &str) -> ApiResult<Vec<ChatMessage>>;
}

/// Work the owner must do after a `finish_*` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    /// The session list may be stale (a session was created or switched).
    RefreshSessions,
    /// The backend rejected the credential; log out after the fixed delay.
    ExpireSession,
}

/// Returned by the async wrappers when the credential was rejected. The
/// expiry notice has already been appended.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{}", EXPIRED_NOTICE)]
pub struct SessionExpired;

fn document_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\.(pdf|docx|eml)(\?.*)?$").expect("static regex"))
}

/// Whether `url` points at a supported document type.
pub fn is_supported_document_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && document_url_pattern().is_match(url)
}

#[derive(Debug, Default)]
pub struct ChatView {
    pub messages: Vec<ChatMessage>,
    pub pending: bool,
    pub document_url: Option<String>,
    pub sessions: Vec<SessionSummary>,
    pub current_session: Option<String>,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_status(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::status(text));
    }

    /// Document URL to attach to queries, if one is set.
    pub fn set_document_url(&mut self, url: Option<String>) {
        self.document_url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    }

    /// Shared failure path: expiry notice plus forced logout, or `on_error`.
    fn fail(&mut self, err: &ApiError, on_error: impl FnOnce(&mut Self, &ApiError)) -> Vec<Followup> {
        if err.is_session_expired() {
            tracing::warn!("Session expired: {}", err);
            self.push_status(EXPIRED_NOTICE);
            return vec![Followup::ExpireSession];
        }
        tracing::warn!("{}", err);
        on_error(self, err);
        Vec::new()
    }

    // -- upload a local file --

    pub fn begin_upload_file(&mut self, file_name: &str) {
        self.push_status(format!("[..] Uploading \"{}\"...", file_name));
    }

    pub fn finish_upload_file(&mut self, result: ApiResult<UploadReceipt>) -> Vec<Followup> {
        match result {
            Ok(receipt) => {
                self.push_status(format!(
                    "[ok] {}",
                    receipt.message.as_deref().unwrap_or("Upload complete")
                ));
                Vec::new()
            }
            Err(e) => self.fail(&e, |view, e| {
                view.push_status(format!("[error] {}", e.message_or(UPLOAD_FALLBACK)))
            }),
        }
    }

    // -- upload from URL --

    /// Returns the URL to send, or `None` after appending a local error.
    pub fn begin_upload_url(&mut self, url: &str) -> Option<String> {
        if !is_supported_document_url(url) {
            self.push_status(format!("[error] {}", INVALID_URL_NOTICE));
            return None;
        }
        self.push_status("[..] Fetching from URL...");
        Some(url.trim().to_string())
    }

    pub fn finish_upload_url(
        &mut self,
        url: &str,
        result: ApiResult<UploadReceipt>,
    ) -> Vec<Followup> {
        match result {
            Ok(receipt) => {
                self.push_status(format!(
                    "[ok] {}",
                    receipt.message.as_deref().unwrap_or("Document fetched")
                ));
                if self.document_url.as_deref() == Some(url) {
                    self.document_url = None;
                }
                Vec::new()
            }
            Err(e) => self.fail(&e, |view, e| {
                view.push_status(format!("[error] {}", e.message_or(URL_UPLOAD_FALLBACK)))
            }),
        }
    }

    // -- query --

    /// Returns the request to send, or `None` after appending a synthetic
    /// error for blank input.
    pub fn begin_query(&mut self, text: &str) -> Option<QueryRequest> {
        if text.trim().is_empty() {
            self.messages.push(ChatMessage::bot_json(json!({
                "error": QUERY_FAILED_TITLE,
                "details": "Query is required",
            })));
            return None;
        }

        self.messages.push(ChatMessage::user(text));
        self.pending = true;
        Some(QueryRequest::new(
            text,
            self.document_url.as_deref(),
            self.current_session.as_deref(),
        ))
    }

    pub fn finish_query(&mut self, result: ApiResult<QueryResponse>) -> Vec<Followup> {
        self.pending = false;
        match result {
            Ok(response) => {
                let mut followups = Vec::new();
                if let Some(id) = response.session_id.clone() {
                    if self.current_session.as_deref() != Some(id.as_str()) {
                        tracing::debug!("Adopting session {}", id);
                        self.current_session = Some(id);
                        followups.push(Followup::RefreshSessions);
                    }
                }
                self.messages.push(ChatMessage::bot_json(response.body));
                followups
            }
            Err(e) => self.fail(&e, |view, e| {
                view.messages.push(ChatMessage::bot_json(json!({
                    "error": QUERY_FAILED_TITLE,
                    "details": e.message_or(QUERY_FALLBACK),
                })))
            }),
        }
    }

    // -- sessions --

    /// Forget the conversation locally. Nothing is deleted on the backend.
    pub fn start_new_chat(&mut self) -> Vec<Followup> {
        self.messages.clear();
        self.current_session = None;
        vec![Followup::RefreshSessions]
    }

    pub fn finish_load_session(
        &mut self,
        session_id: &str,
        result: ApiResult<Vec<ChatMessage>>,
    ) -> Vec<Followup> {
        match result {
            Ok(messages) => {
                self.messages = messages;
                self.current_session = Some(session_id.to_string());
                Vec::new()
            }
            Err(e) => self.fail(&e, |view, _| {
                view.push_status(format!("[error] {}", LOAD_FAILED_NOTICE))
            }),
        }
    }

    /// Replace the cached session list. Failures are only logged.
    pub fn apply_sessions(&mut self, result: ApiResult<Vec<SessionSummary>>) {
        match result {
            Ok(sessions) => self.sessions = sessions,
            Err(e) => tracing::warn!("Failed to fetch chat sessions: {}", e),
        }
    }

    // -- async wrappers --

    async fn run_followups(
        &mut self,
        api: &dyn DocumentApi,
        followups: Vec<Followup>,
    ) -> Result<(), SessionExpired> {
        let mut expired = false;
        for followup in followups {
            match followup {
                Followup::RefreshSessions => self.refresh_sessions(api).await,
                Followup::ExpireSession => expired = true,
            }
        }
        if expired {
            Err(SessionExpired)
        } else {
            Ok(())
        }
    }

    pub async fn refresh_sessions(&mut self, api: &dyn DocumentApi) {
        let result = api.list_sessions().await;
        self.apply_sessions(result);
    }

    pub async fn upload_file(
        &mut self,
        api: &dyn DocumentApi,
        file: &FileUpload,
    ) -> Result<(), SessionExpired> {
        self.begin_upload_file(&file.file_name);
        let result = api.upload_file(file).await;
        let followups = self.finish_upload_file(result);
        self.run_followups(api, followups).await
    }

    pub async fn upload_from_url(
        &mut self,
        api: &dyn DocumentApi,
        url: &str,
    ) -> Result<(), SessionExpired> {
        let Some(url) = self.begin_upload_url(url) else {
            return Ok(());
        };
        let result = api.upload_url(&url).await;
        let followups = self.finish_upload_url(&url, result);
        self.run_followups(api, followups).await
    }

    pub async fn submit_query(
        &mut self,
        api: &dyn DocumentApi,
        text: &str,
    ) -> Result<(), SessionExpired> {
        let Some(request) = self.begin_query(text) else {
            return Ok(());
        };
        let result = api.query(&request).await;
        let followups = self.finish_query(result);
        self.run_followups(api, followups).await
    }

    pub async fn new_chat(&mut self, api: &dyn DocumentApi) -> Result<(), SessionExpired> {
        let followups = self.start_new_chat();
        self.run_followups(api, followups).await
    }

    pub async fn load_session(
        &mut self,
        api: &dyn DocumentApi,
        session_id: &str,
    ) -> Result<(), SessionExpired> {
        let result = api.load_session(session_id).await;
        let followups = self.finish_load_session(session_id, result);
        self.run_followups(api, followups).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageContent, MessageKind, Sender};
    use std::sync::Mutex;

    /// Canned backend. Each endpoint answers from its own slot and records
    /// what it was sent.
    #[derive(Default)]
    struct FakeDocs {
        upload: Mutex<Option<ApiResult<UploadReceipt>>>,
        query: Mutex<Option<ApiResult<QueryResponse>>>,
        sessions: Mutex<Vec<SessionSummary>>,
        history: Mutex<Option<ApiResult<Vec<ChatMessage>>>>,
        calls: Mutex<Vec<String>>,
        sent_queries: Mutex<Vec<QueryRequest>>,
    }

    impl FakeDocs {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn answer_query(&self, result: ApiResult<QueryResponse>) {
            *self.query.lock().unwrap() = Some(result);
        }

        fn answer_upload(&self, result: ApiResult<UploadReceipt>) {
            *self.upload.lock().unwrap() = Some(result);
        }
    }

    #[async_trait]
    impl DocumentApi for FakeDocs {
        async fn upload_file(&self, file: &FileUpload) -> ApiResult<UploadReceipt> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upload {}", file.file_name));
            self.upload.lock().unwrap().take().expect("upload answer")
        }

        async fn upload_url(&self, url: &str) -> ApiResult<UploadReceipt> {
            self.calls.lock().unwrap().push(format!("upload_url {}", url));
            self.upload.lock().unwrap().take().expect("upload answer")
        }

        async fn query(&self, request: &QueryRequest) -> ApiResult<QueryResponse> {
            self.calls.lock().unwrap().push("query".to_string());
            self.sent_queries.lock().unwrap().push(request.clone());
            self.query.lock().unwrap().take().expect("query answer")
        }

        async fn list_sessions(&self) -> ApiResult<Vec<SessionSummary>> {
            self.calls.lock().unwrap().push("list_sessions".to_string());
            Ok(self.sessions.lock().unwrap().clone())
        }

        async fn load_session(&self, session_id: &str) -> ApiResult<Vec<ChatMessage>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("load_session {}", session_id));
            self.history.lock().unwrap().take().expect("history answer")
        }
    }

    fn unauthorized() -> ApiError {
        ApiError::Unauthorized {
            url: "http://x".to_string(),
            message: None,
        }
    }

    fn server_error(message: Option<&str>) -> ApiError {
        ApiError::Server {
            url: "http://x".to_string(),
            status: 500,
            message: message.map(String::from),
        }
    }

    fn last_text(view: &ChatView) -> String {
        view.messages.last().unwrap().content.display_text()
    }

    fn pdf() -> FileUpload {
        FileUpload {
            file_name: "report.pdf".to_string(),
            bytes: b"%PDF".to_vec(),
        }
    }

    #[test]
    fn test_document_url_allow_list() {
        assert!(is_supported_document_url("https://x.test/a.pdf"));
        assert!(is_supported_document_url("https://x.test/A.PDF"));
        assert!(is_supported_document_url("https://x.test/b.docx?sig=1&x=2"));
        assert!(is_supported_document_url("https://x.test/c.eml"));
        assert!(!is_supported_document_url("https://x.test/c.txt"));
        assert!(!is_supported_document_url("https://x.test/a.pdf/page"));
        assert!(!is_supported_document_url("https://x.test/a.pdfx"));
        assert!(!is_supported_document_url(""));
    }

    #[tokio::test]
    async fn test_first_query_adopts_session_and_refreshes() {
        let api = FakeDocs::default();
        api.answer_query(Ok(QueryResponse::from(json!({
            "sessionId": "s1",
            "answers": ["The total is 12"]
        }))));
        api.sessions.lock().unwrap().push(SessionSummary {
            session_id: "s1".to_string(),
            created_at: None,
        });
        let mut view = ChatView::new();

        view.submit_query(&api, "What is the total?").await.unwrap();

        let sent = api.sent_queries.lock().unwrap()[0].clone();
        assert_eq!(
            serde_json::to_value(&sent).unwrap(),
            json!({"documents": [], "questions": ["What is the total?"], "sessionId": null})
        );
        assert_eq!(view.current_session.as_deref(), Some("s1"));
        assert_eq!(api.calls(), vec!["query", "list_sessions"]);
        assert_eq!(view.sessions.len(), 1);
        assert!(!view.pending);

        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[0].sender, Sender::User);
        assert_eq!(view.messages[1].sender, Sender::Bot);
        assert_eq!(view.messages[1].kind, MessageKind::Json);
    }

    #[tokio::test]
    async fn test_answer_saved_from_chat_parses_back_to_response() {
        let body = json!({
            "sessionId": "s1",
            "answers": [{"question": "Total?", "answer": "12", "sources": [3, 4]}],
            "note": "Zürich ✓"
        });
        let api = FakeDocs::default();
        api.answer_query(Ok(QueryResponse::from(body.clone())));
        let mut view = ChatView::new();
        view.submit_query(&api, "Total?").await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let answer = view.messages.last().unwrap();
        let path =
            export::download_response(answer, Some(&dir.path().join("answer.json"))).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved, body);
    }

    #[tokio::test]
    async fn test_same_session_does_not_refresh() {
        let api = FakeDocs::default();
        api.answer_query(Ok(QueryResponse::from(json!({"sessionId": "s1"}))));
        let mut view = ChatView::new();
        view.current_session = Some("s1".to_string());

        view.submit_query(&api, "again?").await.unwrap();

        assert_eq!(api.calls(), vec!["query"]);
        assert_eq!(
            api.sent_queries.lock().unwrap()[0].session_id.as_deref(),
            Some("s1")
        );
    }

    #[tokio::test]
    async fn test_blank_query_is_local_error() {
        let api = FakeDocs::default();
        let mut view = ChatView::new();

        for blank in ["", "   ", "\n\t\n"] {
            let before = view.messages.len();
            view.submit_query(&api, blank).await.unwrap();
            assert_eq!(view.messages.len(), before + 1);
            assert_eq!(
                view.messages.last().unwrap().content,
                MessageContent::Json(json!({"error": "Query Failed", "details": "Query is required"}))
            );
        }
        assert!(api.calls().is_empty());
        assert!(!view.pending);
    }

    #[test]
    fn test_begin_query_appends_one_user_message_and_sets_pending() {
        let mut view = ChatView::new();
        view.set_document_url(Some(" https://x.test/a.pdf ".to_string()));

        let request = view.begin_query("first?\n\nsecond?").unwrap();

        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].sender, Sender::User);
        assert!(view.pending);
        assert_eq!(request.documents, vec!["https://x.test/a.pdf"]);
        assert_eq!(request.questions, vec!["first?", "second?"]);
    }

    #[tokio::test]
    async fn test_query_failure_is_structured_error() {
        let api = FakeDocs::default();
        api.answer_query(Err(server_error(Some("Model overloaded"))));
        let mut view = ChatView::new();

        assert!(view.submit_query(&api, "q").await.is_ok());

        assert!(!view.pending);
        assert_eq!(
            view.messages.last().unwrap().content,
            MessageContent::Json(json!({"error": "Query Failed", "details": "Model overloaded"}))
        );
    }

    #[tokio::test]
    async fn test_query_failure_without_text_uses_fallback() {
        let api = FakeDocs::default();
        api.answer_query(Err(server_error(None)));
        let mut view = ChatView::new();

        view.submit_query(&api, "q").await.unwrap();
        assert_eq!(
            view.messages.last().unwrap().content,
            MessageContent::Json(json!({"error": "Query Failed", "details": "Query failed"}))
        );
    }

    #[tokio::test]
    async fn test_query_401_expires_session() {
        let api = FakeDocs::default();
        api.answer_query(Err(unauthorized()));
        let mut view = ChatView::new();

        let result = view.submit_query(&api, "q").await;

        assert_eq!(result, Err(SessionExpired));
        assert!(!view.pending);
        assert_eq!(last_text(&view), EXPIRED_NOTICE);
        assert_eq!(view.messages.last().unwrap().kind, MessageKind::Status);
    }

    #[test]
    fn test_invalid_token_text_expires_session() {
        let mut view = ChatView::new();
        view.begin_query("q");
        let followups = view.finish_query(Err(server_error(Some("Invalid token"))));
        assert_eq!(followups, vec![Followup::ExpireSession]);
        assert!(!view.pending);
    }

    #[tokio::test]
    async fn test_upload_file_success() {
        let api = FakeDocs::default();
        api.answer_upload(Ok(UploadReceipt {
            message: Some("Indexed 12 chunks".to_string()),
        }));
        let mut view = ChatView::new();

        view.upload_file(&api, &pdf()).await.unwrap();

        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[0].content.display_text(), "[..] Uploading \"report.pdf\"...");
        assert_eq!(last_text(&view), "[ok] Indexed 12 chunks");
        assert_eq!(api.calls(), vec!["upload report.pdf"]);
    }

    #[tokio::test]
    async fn test_upload_file_failure_and_expiry() {
        let api = FakeDocs::default();
        let mut view = ChatView::new();

        api.answer_upload(Err(server_error(None)));
        view.upload_file(&api, &pdf()).await.unwrap();
        assert_eq!(last_text(&view), "[error] Upload failed");

        api.answer_upload(Err(server_error(Some("invalid TOKEN"))));
        assert_eq!(view.upload_file(&api, &pdf()).await, Err(SessionExpired));
        assert_eq!(last_text(&view), EXPIRED_NOTICE);
    }

    #[tokio::test]
    async fn test_bad_url_never_hits_network() {
        let api = FakeDocs::default();
        let mut view = ChatView::new();

        for url in ["https://x.test/notes.txt", "not a url", ""] {
            view.upload_from_url(&api, url).await.unwrap();
            assert_eq!(last_text(&view), format!("[error] {}", INVALID_URL_NOTICE));
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_url_upload_clears_matching_document_url() {
        let api = FakeDocs::default();
        api.answer_upload(Ok(UploadReceipt {
            message: Some("Fetched".to_string()),
        }));
        let mut view = ChatView::new();
        view.set_document_url(Some("https://x.test/a.pdf?v=2".to_string()));

        view.upload_from_url(&api, "https://x.test/a.pdf?v=2")
            .await
            .unwrap();

        assert_eq!(api.calls(), vec!["upload_url https://x.test/a.pdf?v=2"]);
        assert_eq!(last_text(&view), "[ok] Fetched");
        assert_eq!(view.document_url, None);
    }

    #[tokio::test]
    async fn test_url_upload_expiry() {
        let api = FakeDocs::default();
        api.answer_upload(Err(unauthorized()));
        let mut view = ChatView::new();

        let result = view.upload_from_url(&api, "https://x.test/a.eml").await;
        assert_eq!(result, Err(SessionExpired));
    }

    #[tokio::test]
    async fn test_new_chat_clears_and_refreshes() {
        let api = FakeDocs::default();
        let mut view = ChatView::new();
        view.messages.push(ChatMessage::user("old"));
        view.current_session = Some("s1".to_string());

        view.new_chat(&api).await.unwrap();

        assert!(view.messages.is_empty());
        assert_eq!(view.current_session, None);
        assert_eq!(api.calls(), vec!["list_sessions"]);
    }

    #[tokio::test]
    async fn test_load_session_replaces_messages() {
        let api = FakeDocs::default();
        let server_messages = vec![
            ChatMessage::user("What is the total?"),
            ChatMessage::bot_json(json!({"answers": ["12"]})),
        ];
        *api.history.lock().unwrap() = Some(Ok(server_messages.clone()));
        let mut view = ChatView::new();
        view.messages.push(ChatMessage::status("stale"));

        view.load_session(&api, "s7").await.unwrap();

        assert_eq!(view.messages, server_messages);
        assert_eq!(view.current_session.as_deref(), Some("s7"));
    }

    #[tokio::test]
    async fn test_load_session_failure_keeps_state() {
        let api = FakeDocs::default();
        *api.history.lock().unwrap() = Some(Err(server_error(Some("gone"))));
        let mut view = ChatView::new();
        view.messages.push(ChatMessage::user("keep me"));
        view.current_session = Some("s1".to_string());

        view.load_session(&api, "s2").await.unwrap();

        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[0].content.display_text(), "keep me");
        assert_eq!(last_text(&view), format!("[error] {}", LOAD_FAILED_NOTICE));
        assert_eq!(view.current_session.as_deref(), Some("s1"));
    }

    #[test]
    fn test_session_refresh_failure_is_silent() {
        let mut view = ChatView::new();
        view.sessions.push(SessionSummary {
            session_id: "s1".to_string(),
            created_at: None,
        });
        view.apply_sessions(Err(server_error(None)));
        assert_eq!(view.sessions.len(), 1);
        assert!(view.messages.is_empty());
    }
}

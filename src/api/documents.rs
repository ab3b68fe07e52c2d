//! Document, query and history endpoints

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use url::Url;

use super::client::DocClient;
use super::error::ApiResult;
use crate::chat::DocumentApi;
use crate::models::{ChatMessage, ChatSession, QueryRequest, QueryResponse, SessionSummary};

/// A local file ready to be sent as the multipart `file` field.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self { file_name, bytes })
    }

    /// Content type derived from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => "application/pdf",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "eml" => "message/rfc822",
            _ => "application/octet-stream",
        }
    }
}

/// Confirmation returned by both upload endpoints.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct UploadReceipt {
    pub message: Option<String>,
}

#[async_trait]
impl DocumentApi for DocClient {
    async fn upload_file(&self, file: &FileUpload) -> ApiResult<UploadReceipt> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type())
            .unwrap_or_else(|_| reqwest::multipart::Part::bytes(file.bytes.clone()));
        let form = reqwest::multipart::Form::new().part("file", part);
        self.authed_multipart("/api/upload", form).await
    }

    async fn upload_url(&self, url: &str) -> ApiResult<UploadReceipt> {
        let body = serde_json::json!({ "pdfUrl": url });
        self.authed_post("/api/upload/url", &body).await
    }

    async fn query(&self, request: &QueryRequest) -> ApiResult<QueryResponse> {
        self.authed_post("/api/query", request).await
    }

    async fn list_sessions(&self) -> ApiResult<Vec<SessionSummary>> {
        self.authed_get("/api/history").await
    }

    async fn load_session(&self, session_id: &str) -> ApiResult<Vec<ChatMessage>> {
        let session: ChatSession = self
            .authed_get(&history_path(session_id))
            .await?;
        Ok(session.messages)
    }
}

/// `/api/history/{id}` with the id escaped as a single path segment.
fn history_path(session_id: &str) -> String {
    let mut url = Url::parse("http://localhost/api/history").expect("static URL");
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(session_id);
    }
    url.path().to_string()
}

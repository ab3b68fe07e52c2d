//! Save a bot answer's structured body to a JSON file.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::models::ChatMessage;

/// File name used when the caller does not pick one.
pub const DEFAULT_EXPORT_NAME: &str = "llm-response.json";

/// Write `message`'s body as pretty-printed JSON to `path` (or
/// `llm-response.json` in the working directory). Only structured bot
/// messages can be exported.
pub fn download_response(message: &ChatMessage, path: Option<&Path>) -> Result<PathBuf> {
    if !message.is_exportable() {
        bail!("Only structured answers can be saved");
    }

    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_NAME));
    let body = serde_json::to_string_pretty(&message.content.to_json())
        .context("Failed to serialize response")?;
    std::fs::write(&path, body)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("Saved response to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_saved_file_parses_back_to_body() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({
            "answers": ["The total is 12", {"clause": "4.2", "covered": true}],
            "sessionId": "s1",
            "unicode": "Zürich ✓"
        });
        let message = ChatMessage::bot_json(body.clone());

        let path = download_response(&message, Some(&dir.path().join("answer.json"))).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_text_messages_are_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x.json");
        assert!(download_response(&ChatMessage::user("hi"), Some(&target)).is_err());
        assert!(download_response(&ChatMessage::status("[ok] done"), Some(&target)).is_err());
        assert!(!target.exists());
    }
}

//! Query request/response models (`POST /api/query`)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a query request.
///
/// `questions` holds one entry per non-blank line of the user's input.
/// `sessionId` is always serialized, as `null` when no session is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub documents: Vec<String>,
    pub questions: Vec<String>,
    pub session_id: Option<String>,
}

impl QueryRequest {
    pub fn new(text: &str, document_url: Option<&str>, session_id: Option<&str>) -> Self {
        Self {
            documents: document_url
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(|u| vec![u.to_string()])
                .unwrap_or_default(),
            questions: split_questions(text),
            session_id: session_id.map(String::from),
        }
    }
}

/// Split raw input into questions: one per line, trimmed, blanks dropped.
pub fn split_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(String::from)
        .collect()
}

/// Structured answer payload. Kept verbatim; only `sessionId` is interpreted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct QueryResponse {
    pub body: Value,
    pub session_id: Option<String>,
}

impl From<Value> for QueryResponse {
    fn from(body: Value) -> Self {
        let session_id = body
            .get("sessionId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from);
        Self { body, session_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_query_wire_shape() {
        let req = QueryRequest::new("What is the total?", None, None);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "documents": [],
                "questions": ["What is the total?"],
                "sessionId": null
            })
        );
    }

    #[test]
    fn test_multiline_input_splits_and_drops_blanks() {
        let req = QueryRequest::new(
            "  first?\n\n   \nsecond?  \n",
            Some("https://x.test/a.pdf"),
            Some("s9"),
        );
        assert_eq!(req.questions, vec!["first?", "second?"]);
        assert_eq!(req.documents, vec!["https://x.test/a.pdf"]);
        assert_eq!(req.session_id.as_deref(), Some("s9"));
    }

    #[test]
    fn test_blank_document_url_is_omitted() {
        let req = QueryRequest::new("q", Some("   "), None);
        assert!(req.documents.is_empty());
    }

    #[test]
    fn test_response_extracts_session_id() {
        let resp: QueryResponse =
            serde_json::from_value(json!({"sessionId": "s1", "answers": ["12"]})).unwrap();
        assert_eq!(resp.session_id.as_deref(), Some("s1"));
        assert_eq!(resp.body["answers"][0], "12");

        let resp: QueryResponse = serde_json::from_value(json!({"answers": []})).unwrap();
        assert_eq!(resp.session_id, None);
    }
}

//! Tool responses in the shape MCP `tools/call` returns.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// One content block of a tool response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Text payload. Always JSON text in this server.
    Text {
        /// The text.
        text: String,
    },
}

/// Result of a tool call.
///
/// Always carries exactly one content block. Error responses carry
/// `{"error": {code, message, suggestion}}` and set `isError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Content blocks.
    pub content: Vec<ContentBlock>,
    /// Set on failure, omitted on success.
    #[serde(
        rename = "isError",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub is_error: bool,
}

impl ToolResponse {
    /// Whether this response reports a failure.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Text of the single content block.
    pub fn text(&self) -> &str {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => text,
            None => "",
        }
    }

    /// The content block decoded back into JSON.
    pub fn payload(&self) -> JsonValue {
        serde_json::from_str(self.text()).unwrap_or(JsonValue::Null)
    }

    /// `error.code` of an error response.
    pub fn error_code(&self) -> Option<String> {
        self.payload()
            .pointer("/error/code")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
    }

    /// Serialize for the `result` field of a JSON-RPC response.
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// Wrap a successful result.
pub fn format_success(value: &JsonValue) -> ToolResponse {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    ToolResponse {
        content: vec![ContentBlock::Text { text }],
        is_error: false,
    }
}

/// Wrap a failure as a structured error payload.
pub fn format_error(code: &str, message: &str, suggestion: &str) -> ToolResponse {
    let payload = json!({
        "error": {
            "code": code,
            "message": message,
            "suggestion": suggestion,
        }
    });
    let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "null".to_string());
    ToolResponse {
        content: vec![ContentBlock::Text { text }],
        is_error: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let value = json!({"_id": "u1", "tags": ["a", "b"]});
        let response = format_success(&value);

        assert!(!response.is_error());
        assert_eq!(response.content.len(), 1);
        assert_eq!(response.payload(), value);

        let wire = response.to_json();
        assert_eq!(wire["content"][0]["type"], "text");
        assert!(wire.get("isError").is_none());
    }

    #[test]
    fn test_error_shape() {
        let response = format_error("DOCUMENT_NOT_FOUND", "gone", "check the id");

        assert!(response.is_error());
        assert_eq!(response.error_code().as_deref(), Some("DOCUMENT_NOT_FOUND"));
        assert_eq!(
            response.payload(),
            json!({"error": {"code": "DOCUMENT_NOT_FOUND", "message": "gone", "suggestion": "check the id"}})
        );
        assert_eq!(response.to_json()["isError"], json!(true));
    }

    #[test]
    fn test_round_trip_through_wire_format() {
        let response = format_error("X", "m", "s");
        let parsed: ToolResponse = serde_json::from_value(response.to_json()).unwrap();
        assert_eq!(parsed, response);
    }
}

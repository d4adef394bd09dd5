//! Tool registry and category definitions.
//!
//! Provides the infrastructure for registering and dispatching MCP tools.

pub mod collection;
pub mod document;
pub mod schema;
pub mod vector;
pub mod version;
pub mod webhook;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::classify::{DecisionTable, Scope};
use crate::client::ApiError;
use crate::context::ToolContext;
use crate::error::{McpError, Result};
use crate::response::{format_error, format_success, ToolResponse};

/// A tool definition for the MCP tools/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (e.g., "docstore_document_get")
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonValue,
}

impl ToolDef {
    /// Create a new tool definition.
    pub fn new(name: &str, description: &str, input_schema: JsonValue) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Registry of all available tools.
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    /// Create a new registry with all tools registered.
    pub fn new() -> Self {
        let mut tools = Vec::new();

        // Register all tool categories
        tools.extend(document::tools());
        tools.extend(collection::tools());
        tools.extend(schema::tools());
        tools.extend(version::tools());
        tools.extend(webhook::tools());
        tools.extend(vector::tools());

        Self { tools }
    }

    /// Get all tool definitions.
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    /// Look up a tool definition by name.
    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Dispatch a tool call to the appropriate handler.
    ///
    /// Argument problems come back as a `VALIDATION_ERROR` tool response.
    /// Only an unknown tool name is an `Err`.
    pub async fn dispatch(
        &self,
        ctx: &ToolContext,
        name: &str,
        args: Map<String, JsonValue>,
    ) -> Result<ToolResponse> {
        // Route based on prefix
        let outcome = if name.starts_with("docstore_document_") {
            document::dispatch(ctx, name, args).await
        } else if name.starts_with("docstore_collection_") {
            collection::dispatch(ctx, name, args).await
        } else if name.starts_with("docstore_schema_") {
            schema::dispatch(ctx, name, args).await
        } else if name.starts_with("docstore_version_") {
            version::dispatch(ctx, name, args).await
        } else if name.starts_with("docstore_webhook_") {
            webhook::dispatch(ctx, name, args).await
        } else if name.starts_with("docstore_vector_") {
            vector::dispatch(ctx, name, args).await
        } else {
            Err(McpError::UnknownTool(name.to_string()))
        };

        match outcome {
            Err(err) if err.is_argument_error() => {
                tracing::debug!(tool = name, error = %err, "rejected tool arguments");
                Ok(validation_error(name, &err))
            }
            other => other,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Error response for arguments rejected before any API call.
pub fn validation_error(tool: &str, err: &McpError) -> ToolResponse {
    format_error(
        "VALIDATION_ERROR",
        &err.to_string(),
        &format!(
            "Check the arguments against the input schema of {} in tools/list and retry",
            tool
        ),
    )
}

/// Turn the outcome of an API call into a tool response.
pub(crate) fn respond(
    tool: &str,
    outcome: std::result::Result<JsonValue, ApiError>,
    table: &DecisionTable,
    scope: &Scope,
) -> ToolResponse {
    match outcome {
        Ok(value) => format_success(&value),
        Err(err) => {
            let classified = table.classify(&err, scope);
            tracing::warn!(
                tool,
                status = ?err.status(),
                code = %classified.code,
                "docstore call failed: {}",
                err
            );
            classified.into_response()
        }
    }
}

/// Helper macro for creating JSON Schema for tool input parameters.
#[macro_export]
macro_rules! schema {
    // Object with required and optional properties
    (object {
        required: { $($req_name:literal : $req_type:tt),* $(,)? },
        optional: { $($opt_name:literal : $opt_type:tt),* $(,)? }
    }) => {{
        let mut required: Vec<&str> = Vec::new();
        $(required.push($req_name);)*

        let mut props = serde_json::Map::new();
        $(props.insert($req_name.to_string(), schema!(@type $req_type));)*
        $(props.insert($opt_name.to_string(), schema!(@type $opt_type));)*

        serde_json::json!({
            "type": "object",
            "properties": props,
            "required": required
        })
    }};

    // Object with only required properties
    (object {
        required: { $($req_name:literal : $req_type:tt),* $(,)? }
    }) => {{
        let mut required: Vec<&str> = Vec::new();
        $(required.push($req_name);)*

        let mut props = serde_json::Map::new();
        $(props.insert($req_name.to_string(), schema!(@type $req_type));)*

        serde_json::json!({
            "type": "object",
            "properties": props,
            "required": required
        })
    }};

    // Empty object (no parameters)
    (object {}) => {{
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }};

    // Type mappings
    (@type string) => { serde_json::json!({"type": "string"}) };
    (@type number) => { serde_json::json!({"type": "number"}) };
    (@type integer) => { serde_json::json!({"type": "integer"}) };
    (@type positive_integer) => { serde_json::json!({"type": "integer", "minimum": 1}) };
    (@type boolean) => { serde_json::json!({"type": "boolean"}) };
    (@type object) => { serde_json::json!({"type": "object"}) };
    (@type any) => { serde_json::json!({}) };
    (@type array_string) => { serde_json::json!({"type": "array", "items": {"type": "string"}}) };
    (@type array_object) => { serde_json::json!({"type": "array", "items": {"type": "object"}}) };
}

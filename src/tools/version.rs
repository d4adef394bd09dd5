//! Document version history tools.
//!
//! Tools: docstore_version_list, docstore_version_get, docstore_version_restore,
//!        docstore_version_diff
//!
//! Version numbers start at 1; zero and negative numbers are rejected before
//! any call is made.

use serde_json::{Map, Value as JsonValue};

use crate::classify::{DecisionTable, Rule, Scope};
use crate::client::ApiRequest;
use crate::context::ToolContext;
use crate::convert::{get_bounded_u64, get_optional_u64, get_positive_u64, get_string_arg};
use crate::error::{McpError, Result};
use crate::response::ToolResponse;
use crate::schema;
use crate::tools::{respond, ToolDef};

const FALLBACK_SUGGESTION: &str =
    "Check the collection name, document ID and version numbers, then retry";

const NOT_ON_PLAN: &str =
    "Version history is not enabled for this project; enable versioning in the Docstore dashboard";

const LIST: DecisionTable = DecisionTable::new(
    "LIST_VERSIONS",
    &[
        Rule::new(
            404,
            "DOCUMENT_NOT_FOUND",
            "Document '{id}' was not found in '{collection}'",
            "Verify the document ID with docstore_collection_query",
        ),
        Rule::new(
            403,
            "VERSIONING_NOT_AVAILABLE",
            "Versioning is not available: {message}",
            NOT_ON_PLAN,
        ),
    ],
    FALLBACK_SUGGESTION,
);

const GET: DecisionTable = DecisionTable::new(
    "GET_VERSION",
    &[
        Rule::new(
            404,
            "VERSION_NOT_FOUND",
            "Version {version} of '{id}' was not found in '{collection}'",
            "Use docstore_version_list to see which versions exist",
        ),
        Rule::new(
            403,
            "VERSIONING_NOT_AVAILABLE",
            "Versioning is not available: {message}",
            NOT_ON_PLAN,
        ),
    ],
    FALLBACK_SUGGESTION,
);

const RESTORE: DecisionTable = DecisionTable::new(
    "RESTORE_VERSION",
    &[
        Rule::new(
            404,
            "VERSION_NOT_FOUND",
            "Version {version} of '{id}' was not found in '{collection}'",
            "Use docstore_version_list to see which versions exist",
        ),
        Rule::new(
            409,
            "RESTORE_CONFLICT",
            "Version {version} of '{id}' could not be restored: {message}",
            "The document changed while restoring; fetch it with docstore_document_get and retry",
        ),
        Rule::new(
            403,
            "VERSIONING_NOT_AVAILABLE",
            "Versioning is not available: {message}",
            NOT_ON_PLAN,
        ),
    ],
    FALLBACK_SUGGESTION,
);

const DIFF: DecisionTable = DecisionTable::new(
    "DIFF_VERSIONS",
    &[
        Rule::new(
            403,
            "DIFF_NOT_AVAILABLE",
            "Version diffs are not available: {message}",
            "Fetch both versions with docstore_version_get and compare them instead",
        ),
        Rule::new(
            404,
            "VERSION_NOT_FOUND",
            "Version {from} or {to} of '{id}' was not found in '{collection}'",
            "Use docstore_version_list to see which versions exist",
        ),
        Rule::new(
            400,
            "INVALID_VERSION_RANGE",
            "Cannot diff version {from} against version {to}: {message}",
            "Pick two existing versions, usually with from lower than to",
        ),
    ],
    FALLBACK_SUGGESTION,
);

/// Get all version tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "docstore_version_list",
            "List the stored versions of a document, newest first.",
            schema!(object {
                required: { "collection": string, "id": string },
                optional: { "limit": positive_integer, "offset": integer }
            }),
        ),
        ToolDef::new(
            "docstore_version_get",
            "Get a document as it was at a specific version (versions start at 1).",
            schema!(object {
                required: { "collection": string, "id": string, "version": positive_integer }
            }),
        ),
        ToolDef::new(
            "docstore_version_restore",
            "Restore a document to a previous version. The restore itself creates a new version.",
            schema!(object {
                required: { "collection": string, "id": string, "version": positive_integer }
            }),
        ),
        ToolDef::new(
            "docstore_version_diff",
            "Show the changes between two versions of a document.",
            schema!(object {
                required: {
                    "collection": string,
                    "id": string,
                    "from": positive_integer,
                    "to": positive_integer
                }
            }),
        ),
    ]
}

/// Dispatch a version tool call.
pub async fn dispatch(
    ctx: &ToolContext,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<ToolResponse> {
    match name {
        "docstore_version_list" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let limit = get_bounded_u64(&args, "limit", 1, 1000)?;
            let offset = get_optional_u64(&args, "offset")?;
            let scope = Scope::new().with("collection", &collection).with("id", &id);

            let request = ApiRequest::get([collection.as_str(), id.as_str(), "versions"])
                .query_opt("limit", limit)
                .query_opt("offset", offset);
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &LIST, &scope))
        }

        "docstore_version_get" | "docstore_version_restore" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let version = get_positive_u64(&args, "version")?.to_string();
            let scope = Scope::new()
                .with("collection", &collection)
                .with("id", &id)
                .with("version", &version);

            let base = [collection.as_str(), id.as_str(), "versions", version.as_str()];
            let (request, table) = if name == "docstore_version_get" {
                (ApiRequest::get(base), &GET)
            } else {
                (ApiRequest::post(base.into_iter().chain(["restore"])), &RESTORE)
            };
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, table, &scope))
        }

        "docstore_version_diff" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let from = get_positive_u64(&args, "from")?;
            let to = get_positive_u64(&args, "to")?;
            let scope = Scope::new()
                .with("collection", &collection)
                .with("id", &id)
                .with("from", from)
                .with("to", to);

            let request = ApiRequest::get([collection.as_str(), id.as_str(), "versions", "diff"])
                .query("from", from.to_string())
                .query("to", to.to_string());
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &DIFF, &scope))
        }

        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

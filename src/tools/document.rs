//! Document CRUD tools.
//!
//! Tools: docstore_document_create, docstore_document_get, docstore_document_update,
//!        docstore_document_merge, docstore_document_patch, docstore_document_delete

use serde_json::{Map, Value as JsonValue};

use crate::classify::{DecisionTable, Rule, Scope};
use crate::client::ApiRequest;
use crate::context::ToolContext;
use crate::convert::{get_array_arg, get_object_arg, get_string_arg};
use crate::error::{McpError, Result};
use crate::response::ToolResponse;
use crate::schema;
use crate::tools::{respond, ToolDef};

const FALLBACK_SUGGESTION: &str =
    "Check that the collection name and document ID are correct and that the Docstore API is reachable, then retry";

const CREATE: DecisionTable = DecisionTable::new(
    "CREATE_DOCUMENT",
    &[
        Rule::new(
            409,
            "DOCUMENT_CONFLICT",
            "A document with this ID already exists in '{collection}': {message}",
            "Use docstore_document_update to replace the existing document, or remove _id from data to let the server assign one",
        ),
        Rule::new(
            400,
            "VALIDATION_ERROR",
            "{message}",
            "Fix the document so it matches the schema of '{collection}' (see docstore_schema_get) and retry",
        ),
        Rule::new(
            413,
            "DOCUMENT_TOO_LARGE",
            "The document exceeds the size limit for '{collection}'",
            "Reduce the document size, for example by storing large blobs elsewhere and keeping a reference",
        ),
    ],
    FALLBACK_SUGGESTION,
);

const GET: DecisionTable = DecisionTable::new(
    "GET_DOCUMENT",
    &[Rule::new(
        404,
        "DOCUMENT_NOT_FOUND",
        "Document '{id}' was not found in '{collection}'",
        "Verify the document ID with docstore_collection_query, or check the collection name with docstore_collection_list",
    )],
    FALLBACK_SUGGESTION,
);

const UPDATE: DecisionTable = DecisionTable::new(
    "UPDATE_DOCUMENT",
    &[
        Rule::new(
            404,
            "DOCUMENT_NOT_FOUND",
            "Document '{id}' was not found in '{collection}'",
            "Use docstore_document_create to create the document first",
        ),
        Rule::new(
            400,
            "VALIDATION_ERROR",
            "{message}",
            "Fix the document so it matches the schema of '{collection}' (see docstore_schema_get) and retry",
        ),
        Rule::new(
            409,
            "DOCUMENT_CONFLICT",
            "Document '{id}' was modified concurrently: {message}",
            "Fetch the latest version with docstore_document_get and retry the update",
        ),
        Rule::new(
            413,
            "DOCUMENT_TOO_LARGE",
            "The document exceeds the size limit for '{collection}'",
            "Reduce the document size, for example by storing large blobs elsewhere and keeping a reference",
        ),
    ],
    FALLBACK_SUGGESTION,
);

const MERGE: DecisionTable = DecisionTable::new(
    "MERGE_DOCUMENT",
    &[
        Rule::new(
            404,
            "DOCUMENT_NOT_FOUND",
            "Document '{id}' was not found in '{collection}'",
            "Use docstore_document_create to create the document first",
        ),
        Rule::new(
            400,
            "VALIDATION_ERROR",
            "{message}",
            "The merged document must still match the schema of '{collection}' (see docstore_schema_get)",
        ),
        Rule::new(
            413,
            "DOCUMENT_TOO_LARGE",
            "The merged document exceeds the size limit for '{collection}'",
            "Send fewer or smaller fields",
        ),
    ],
    FALLBACK_SUGGESTION,
);

const PATCH: DecisionTable = DecisionTable::new(
    "PATCH_DOCUMENT",
    &[
        Rule::new(
            404,
            "DOCUMENT_NOT_FOUND",
            "Document '{id}' was not found in '{collection}'",
            "Verify the document ID with docstore_collection_query",
        ),
        Rule::new(
            409,
            "PATCH_CONFLICT",
            "The patch could not be applied to '{id}': a test operation failed or a path conflicts with the document structure ({message})",
            "Fetch the document with docstore_document_get, align test values and paths with its current state, and retry",
        ),
        Rule::new(
            400,
            "INVALID_PATCH",
            "{message}",
            "Each operation needs op, a JSON Pointer path such as /address/city, value for add/replace/test, and from for move/copy",
        ),
    ],
    FALLBACK_SUGGESTION,
);

const DELETE: DecisionTable = DecisionTable::new(
    "DELETE_DOCUMENT",
    &[Rule::new(
        404,
        "DOCUMENT_NOT_FOUND",
        "Document '{id}' was not found in '{collection}'",
        "The document may already be deleted; verify the ID with docstore_collection_query",
    )],
    FALLBACK_SUGGESTION,
);

/// JSON Patch operation names.
pub const PATCH_OPS: [&str; 6] = ["add", "remove", "replace", "move", "copy", "test"];

/// Get all document tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "docstore_document_create",
            "Create a document in a collection. Include _id in data to choose the ID, otherwise the server assigns one. \
             Returns the stored document.",
            schema!(object {
                required: { "collection": string, "data": object }
            }),
        ),
        ToolDef::new(
            "docstore_document_get",
            "Get a document by ID.",
            schema!(object {
                required: { "collection": string, "id": string }
            }),
        ),
        ToolDef::new(
            "docstore_document_update",
            "Replace a document entirely. Fields not present in data are removed.",
            schema!(object {
                required: { "collection": string, "id": string, "data": object }
            }),
        ),
        ToolDef::new(
            "docstore_document_merge",
            "Partially update a document. Only the fields in data are changed; other fields are kept.",
            schema!(object {
                required: { "collection": string, "id": string, "data": object }
            }),
        ),
        ToolDef::new(
            "docstore_document_patch",
            "Apply an RFC 6902 JSON Patch to a document. Operations run in order and atomically; \
             a failing test operation aborts the whole patch.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "collection": {"type": "string"},
                    "id": {"type": "string"},
                    "operations": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "op": {"type": "string", "enum": PATCH_OPS},
                                "path": {"type": "string", "description": "JSON Pointer, e.g. /address/city"},
                                "value": {"description": "Required for add, replace and test"},
                                "from": {"type": "string", "description": "Required for move and copy"}
                            },
                            "required": ["op", "path"]
                        }
                    }
                },
                "required": ["collection", "id", "operations"]
            }),
        ),
        ToolDef::new(
            "docstore_document_delete",
            "Delete a document by ID.",
            schema!(object {
                required: { "collection": string, "id": string }
            }),
        ),
    ]
}

/// Dispatch a document tool call.
pub async fn dispatch(
    ctx: &ToolContext,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<ToolResponse> {
    match name {
        "docstore_document_create" => {
            let collection = get_string_arg(&args, "collection")?;
            let data = get_object_arg(&args, "data")?;
            let scope = Scope::new().with("collection", &collection);

            let request = ApiRequest::post([collection.as_str()]).body(JsonValue::Object(data));
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &CREATE, &scope))
        }

        "docstore_document_get" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let scope = Scope::new().with("collection", &collection).with("id", &id);

            let outcome = ctx
                .client()
                .call(ApiRequest::get([collection.as_str(), id.as_str()]))
                .await;
            Ok(respond(name, outcome, &GET, &scope))
        }

        "docstore_document_update" | "docstore_document_merge" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let data = get_object_arg(&args, "data")?;
            let scope = Scope::new().with("collection", &collection).with("id", &id);

            let segments = [collection.as_str(), id.as_str()];
            let (request, table) = if name == "docstore_document_update" {
                (ApiRequest::put(segments), &UPDATE)
            } else {
                (ApiRequest::patch(segments), &MERGE)
            };
            let outcome = ctx.client().call(request.body(JsonValue::Object(data))).await;
            Ok(respond(name, outcome, table, &scope))
        }

        "docstore_document_patch" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let operations = parse_patch_operations(&args)?;
            let scope = Scope::new().with("collection", &collection).with("id", &id);

            let request = ApiRequest::patch([collection.as_str(), id.as_str()])
                .body(JsonValue::Array(operations));
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &PATCH, &scope))
        }

        "docstore_document_delete" => {
            let collection = get_string_arg(&args, "collection")?;
            let id = get_string_arg(&args, "id")?;
            let scope = Scope::new().with("collection", &collection).with("id", &id);

            let outcome = ctx
                .client()
                .call(ApiRequest::delete([collection.as_str(), id.as_str()]))
                .await;
            Ok(respond(name, outcome, &DELETE, &scope))
        }

        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

/// Validate the `operations` argument. Operations are forwarded unchanged.
fn parse_patch_operations(args: &Map<String, JsonValue>) -> Result<Vec<JsonValue>> {
    let operations = get_array_arg(args, "operations")?;

    for (i, item) in operations.iter().enumerate() {
        let arg = |field: &str| format!("operations[{}]{}", i, field);

        let obj = item.as_object().ok_or_else(|| {
            McpError::invalid_arg(arg(""), "Expected an object with op and path")
        })?;

        let op = obj
            .get("op")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::invalid_arg(arg(".op"), "Missing or invalid op"))?;
        if !PATCH_OPS.contains(&op) {
            return Err(McpError::invalid_arg(
                arg(".op"),
                format!("Unknown op '{}'. Use one of: {}", op, PATCH_OPS.join(", ")),
            ));
        }

        if !obj.get("path").is_some_and(JsonValue::is_string) {
            return Err(McpError::invalid_arg(arg(".path"), "Missing or invalid path"));
        }

        match op {
            "add" | "replace" | "test" if !obj.contains_key("value") => {
                return Err(McpError::invalid_arg(
                    arg(".value"),
                    format!("'{}' requires a value", op),
                ));
            }
            "move" | "copy" if !obj.get("from").is_some_and(JsonValue::is_string) => {
                return Err(McpError::invalid_arg(
                    arg(".from"),
                    format!("'{}' requires a from path", op),
                ));
            }
            _ => {}
        }
    }

    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ops(value: JsonValue) -> Map<String, JsonValue> {
        let mut args = Map::new();
        args.insert("operations".to_string(), value);
        args
    }

    #[test]
    fn test_valid_patch_is_forwarded_unchanged() {
        let input = json!([
            {"op": "test", "path": "/status", "value": "draft"},
            {"op": "replace", "path": "/status", "value": "published"},
            {"op": "move", "from": "/tmp", "path": "/archive"},
            {"op": "remove", "path": "/draft_notes"}
        ]);
        let parsed = parse_patch_operations(&ops(input.clone())).unwrap();
        assert_eq!(JsonValue::Array(parsed), input);
    }

    #[test]
    fn test_null_value_counts_as_present() {
        let input = json!([{"op": "add", "path": "/deleted_at", "value": null}]);
        assert!(parse_patch_operations(&ops(input)).is_ok());
    }

    #[test]
    fn test_invalid_patches() {
        let cases = [
            json!([]),
            json!([{"op": "rename", "path": "/a"}]),
            json!([{"op": "add", "path": "/a"}]),
            json!([{"op": "copy", "path": "/a"}]),
            json!([{"op": "remove"}]),
            json!(["remove /a"]),
        ];
        for case in cases {
            assert!(
                parse_patch_operations(&ops(case.clone())).is_err(),
                "expected rejection of {}",
                case
            );
        }
    }
}

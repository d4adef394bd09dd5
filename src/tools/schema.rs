//! Collection schema tools.
//!
//! Tools: docstore_schema_get, docstore_schema_set, docstore_schema_delete,
//!        docstore_schema_validate

use serde_json::{json, Map, Value as JsonValue};

use crate::classify::{DecisionTable, Rule, Scope};
use crate::client::ApiRequest;
use crate::context::ToolContext;
use crate::convert::{get_object_arg, get_string_arg};
use crate::error::{McpError, Result};
use crate::response::ToolResponse;
use crate::schema;
use crate::tools::{respond, ToolDef};

const FALLBACK_SUGGESTION: &str =
    "Check that the collection name is correct and that the Docstore API is reachable, then retry";

const GET: DecisionTable = DecisionTable::new(
    "GET_SCHEMA",
    &[Rule::new(
        404,
        "SCHEMA_NOT_FOUND",
        "Collection '{collection}' has no schema",
        "Documents in '{collection}' are unconstrained; use docstore_schema_set to add a schema",
    )],
    FALLBACK_SUGGESTION,
);

const SET: DecisionTable = DecisionTable::new(
    "SET_SCHEMA",
    &[
        Rule::new(
            400,
            "INVALID_SCHEMA",
            "The schema was rejected: {message}",
            "Provide a valid JSON Schema object, e.g. {\"type\": \"object\", \"properties\": {...}, \"required\": [...]}",
        ),
        Rule::new(
            409,
            "SCHEMA_CONFLICT",
            "Existing documents in '{collection}' do not satisfy the new schema: {message}",
            "Fix or migrate the non-conforming documents first, or relax the schema",
        ),
        Rule::new(
            404,
            "COLLECTION_NOT_FOUND",
            "Collection '{collection}' does not exist",
            "Use docstore_collection_list to see the available collections",
        ),
    ],
    FALLBACK_SUGGESTION,
);

const DELETE: DecisionTable = DecisionTable::new(
    "DELETE_SCHEMA",
    &[Rule::new(
        404,
        "SCHEMA_NOT_FOUND",
        "Collection '{collection}' has no schema to delete",
        "Nothing to do; use docstore_schema_get to confirm",
    )],
    FALLBACK_SUGGESTION,
);

const VALIDATE: DecisionTable = DecisionTable::new(
    "VALIDATE_DOCUMENT",
    &[
        Rule::new(
            404,
            "SCHEMA_NOT_FOUND",
            "Collection '{collection}' has no schema to validate against",
            "Use docstore_schema_set to define a schema first",
        ),
        Rule::new(
            400,
            "VALIDATION_ERROR",
            "{message}",
            "Compare the document with docstore_schema_get for '{collection}' and fix the listed fields",
        ),
    ],
    FALLBACK_SUGGESTION,
);

/// Get all schema tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "docstore_schema_get",
            "Get the JSON Schema of a collection.",
            schema!(object {
                required: { "collection": string }
            }),
        ),
        ToolDef::new(
            "docstore_schema_set",
            "Set or replace the JSON Schema of a collection. New and updated documents are validated against it.",
            schema!(object {
                required: { "collection": string, "schema": object }
            }),
        ),
        ToolDef::new(
            "docstore_schema_delete",
            "Remove the schema of a collection.",
            schema!(object {
                required: { "collection": string }
            }),
        ),
        ToolDef::new(
            "docstore_schema_validate",
            "Validate a document against the collection schema without storing it.",
            schema!(object {
                required: { "collection": string, "document": object }
            }),
        ),
    ]
}

/// Dispatch a schema tool call.
pub async fn dispatch(
    ctx: &ToolContext,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<ToolResponse> {
    match name {
        "docstore_schema_get" => {
            let collection = get_string_arg(&args, "collection")?;
            let scope = Scope::new().with("collection", &collection);
            let outcome = ctx
                .client()
                .call(ApiRequest::get([collection.as_str(), "_schema"]))
                .await;
            Ok(respond(name, outcome, &GET, &scope))
        }

        "docstore_schema_set" => {
            let collection = get_string_arg(&args, "collection")?;
            let schema = get_object_arg(&args, "schema")?;
            let scope = Scope::new().with("collection", &collection);
            let request =
                ApiRequest::put([collection.as_str(), "_schema"]).body(JsonValue::Object(schema));
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &SET, &scope))
        }

        "docstore_schema_delete" => {
            let collection = get_string_arg(&args, "collection")?;
            let scope = Scope::new().with("collection", &collection);
            let outcome = ctx
                .client()
                .call(ApiRequest::delete([collection.as_str(), "_schema"]))
                .await;
            Ok(respond(name, outcome, &DELETE, &scope))
        }

        "docstore_schema_validate" => {
            let collection = get_string_arg(&args, "collection")?;
            let document = get_object_arg(&args, "document")?;
            let scope = Scope::new().with("collection", &collection);
            let request = ApiRequest::post([collection.as_str(), "_schema", "validate"])
                .body(json!({ "document": document }));
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &VALIDATE, &scope))
        }

        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

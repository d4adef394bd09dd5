//! Vector search tools.
//!
//! Tools: docstore_vector_search, docstore_vector_store
//!
//! Embeddings are computed server-side. `docstore_vector_store` only marks
//! which string field of the document to embed.

use serde_json::{json, Map, Value as JsonValue};

use crate::classify::{DecisionTable, Rule, Scope};
use crate::client::ApiRequest;
use crate::context::ToolContext;
use crate::convert::{
    get_bounded_u64, get_object_arg, get_optional_f64, get_optional_string, get_string_arg,
};
use crate::error::{McpError, Result};
use crate::filter::{compile, filters_schema, parse_filters};
use crate::response::ToolResponse;
use crate::tools::{respond, ToolDef};

/// Field of the stored document naming the field to embed.
pub const EMBED_MARKER: &str = "_embed";

const SEARCH: DecisionTable = DecisionTable::new(
    "SEARCH",
    &[
        Rule::new(
            403,
            "SEARCH_NOT_AVAILABLE",
            "Vector search is not available: {message}",
            "Enable vector search for this project in the Docstore dashboard",
        ),
        Rule::new(
            404,
            "COLLECTION_NOT_FOUND",
            "Collection '{collection}' does not exist",
            "Use docstore_collection_list to see the available collections",
        ),
        Rule::new(
            400,
            "INVALID_QUERY",
            "{message}",
            "Use a non-empty query, limit between 1 and 100 and threshold between 0 and 1",
        ),
    ],
    "Check that '{collection}' has documents stored with docstore_vector_store, then retry",
);

const STORE: DecisionTable = DecisionTable::new(
    "STORE_EMBEDDING",
    &[
        Rule::new(
            403,
            "EMBEDDING_NOT_AVAILABLE",
            "Embeddings are not available: {message}",
            "Enable vector search for this project in the Docstore dashboard",
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
            "The document or the text to embed exceeds the size limit",
            "Shorten the text in the embedded field or split it across several documents",
        ),
        Rule::new(
            409,
            "DOCUMENT_CONFLICT",
            "The document conflicts with an existing one in '{collection}': {message}",
            "Pass id to replace the existing document instead of creating a new one",
        ),
    ],
    "Check the collection name and that the Docstore API is reachable, then retry",
);

/// Get all vector tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "docstore_vector_search",
            "Semantic search over a collection. Returns the documents closest in meaning to the query, \
             each with a similarity score. threshold drops matches scoring below it; filters narrow \
             the candidates like docstore_collection_query.",
            json!({
                "type": "object",
                "properties": {
                    "collection": {"type": "string"},
                    "query": {"type": "string", "description": "Natural-language search text"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                    "threshold": {"type": "number", "minimum": 0, "maximum": 1},
                    "filters": filters_schema()
                },
                "required": ["collection", "query"]
            }),
        ),
        ToolDef::new(
            "docstore_vector_store",
            "Store a document and embed one of its text fields for docstore_vector_search. \
             embed_field names the string field of data to embed. Without id a new document is \
             created; with id the document is replaced.",
            json!({
                "type": "object",
                "properties": {
                    "collection": {"type": "string"},
                    "data": {"type": "object"},
                    "embed_field": {"type": "string"},
                    "id": {"type": "string"}
                },
                "required": ["collection", "data", "embed_field"]
            }),
        ),
    ]
}

/// Dispatch a vector tool call.
pub async fn dispatch(
    ctx: &ToolContext,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<ToolResponse> {
    match name {
        "docstore_vector_search" => {
            let collection = get_string_arg(&args, "collection")?;
            let query = get_string_arg(&args, "query")?;
            let limit = get_bounded_u64(&args, "limit", 1, 100)?;
            let threshold = get_optional_f64(&args, "threshold")?;
            if let Some(t) = threshold {
                if !(0.0..=1.0).contains(&t) {
                    return Err(McpError::invalid_arg(
                        "threshold",
                        "must be between 0 and 1",
                    ));
                }
            }
            let filters = parse_filters(&args, "filters")?;
            let scope = Scope::new().with("collection", &collection);

            let mut body = Map::new();
            body.insert("query".to_string(), JsonValue::String(query));
            if let Some(limit) = limit {
                body.insert("limit".to_string(), json!(limit));
            }
            if let Some(threshold) = threshold {
                body.insert("threshold".to_string(), json!(threshold));
            }
            let compiled = compile(&filters);
            if !compiled.is_empty() {
                body.insert("filter".to_string(), JsonValue::Object(compiled));
            }

            let request =
                ApiRequest::post([collection.as_str(), "_search"]).body(JsonValue::Object(body));
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &SEARCH, &scope))
        }

        "docstore_vector_store" => {
            let collection = get_string_arg(&args, "collection")?;
            let data = get_object_arg(&args, "data")?;
            let embed_field = get_string_arg(&args, "embed_field")?;
            let id = get_optional_string(&args, "id")?;
            let body = embedding_body(data, &embed_field)?;
            let scope = Scope::new().with("collection", &collection);

            let request = match &id {
                Some(id) => ApiRequest::put([collection.as_str(), id.as_str()]),
                None => ApiRequest::post([collection.as_str()]),
            };
            let outcome = ctx.client().call(request.body(body)).await;
            Ok(respond(name, outcome, &STORE, &scope))
        }

        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

/// The document to store, with the embedding marker added.
fn embedding_body(mut data: Map<String, JsonValue>, embed_field: &str) -> Result<JsonValue> {
    match data.get(embed_field) {
        Some(JsonValue::String(_)) => {}
        Some(_) => {
            return Err(McpError::invalid_arg(
                "embed_field",
                format!("data.{} must be a string to be embedded", embed_field),
            ))
        }
        None => {
            return Err(McpError::invalid_arg(
                "embed_field",
                format!("data has no field '{}'", embed_field),
            ))
        }
    }
    data.insert(
        EMBED_MARKER.to_string(),
        JsonValue::String(embed_field.to_string()),
    );
    Ok(JsonValue::Object(data))
}

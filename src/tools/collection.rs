//! Collection-level tools.
//!
//! Tools: docstore_collection_list, docstore_collection_query,
//!        docstore_collection_import, docstore_collection_export

use serde_json::{json, Map, Value as JsonValue};

use crate::classify::{DecisionTable, Rule, Scope};
use crate::client::ApiRequest;
use crate::context::ToolContext;
use crate::convert::{
    get_array_arg, get_bounded_u64, get_optional_object, get_optional_string, get_optional_u64,
    get_string_arg,
};
use crate::error::{McpError, Result};
use crate::filter::{compile, filters_schema, parse_filters};
use crate::response::ToolResponse;
use crate::schema;
use crate::tools::{respond, ToolDef};

const FALLBACK_SUGGESTION: &str =
    "Check that the collection name is correct and that the Docstore API is reachable, then retry";

const LIST: DecisionTable = DecisionTable::new(
    "LIST_COLLECTIONS",
    &[Rule::new(
        404,
        "PROJECT_NOT_FOUND",
        "The configured project does not exist: {message}",
        "Check DOCSTORE_PROJECT (or DOCSTORE_NAMESPACE) against the projects in the Docstore dashboard",
    )],
    "Check that DOCSTORE_PROJECT is correct and that the Docstore API is reachable, then retry",
);

const QUERY: DecisionTable = DecisionTable::new(
    "QUERY_DOCUMENTS",
    &[
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
            "Check filter field names and operators (eq, neq, gt, gte, lt, lte, contains, in, exists) and the sort expression",
        ),
    ],
    FALLBACK_SUGGESTION,
);

const IMPORT: DecisionTable = DecisionTable::new(
    "IMPORT",
    &[
        Rule::new(
            409,
            "IMPORT_CONFLICT",
            "Some documents collide with existing IDs in '{collection}': {message}",
            "Retry with on_conflict set to 'skip' to keep existing documents or 'overwrite' to replace them",
        ),
        Rule::new(
            413,
            "IMPORT_TOO_LARGE",
            "The import batch exceeds the size limit: {message}",
            "Split the documents into smaller batches and import them one at a time",
        ),
        Rule::new(
            400,
            "VALIDATION_ERROR",
            "{message}",
            "Fix the rejected documents so they match the schema of '{collection}' (see docstore_schema_get)",
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

const EXPORT: DecisionTable = DecisionTable::new(
    "EXPORT",
    &[
        Rule::new(
            404,
            "COLLECTION_NOT_FOUND",
            "Collection '{collection}' does not exist",
            "Use docstore_collection_list to see the available collections",
        ),
        Rule::new(
            400,
            "INVALID_FILTER",
            "{message}",
            "Use field: value for equality or field: {\"$op\": value} with gt, gte, lt, lte, neq, contains, in or exists",
        ),
        Rule::new(
            413,
            "EXPORT_TOO_LARGE",
            "The export is too large to return in one response: {message}",
            "Narrow the export with a filter, or page through docstore_collection_query with limit and offset",
        ),
    ],
    FALLBACK_SUGGESTION,
);

/// How an import treats documents whose ID already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictMode {
    /// Abort the import.
    Fail,
    /// Keep the existing document.
    Skip,
    /// Replace the existing document.
    Overwrite,
}

impl ConflictMode {
    fn parse(s: Option<&str>) -> Result<Self> {
        match s {
            Some("fail") | None => Ok(ConflictMode::Fail),
            Some("skip") => Ok(ConflictMode::Skip),
            Some("overwrite") => Ok(ConflictMode::Overwrite),
            Some(other) => Err(McpError::invalid_arg(
                "on_conflict",
                format!(
                    "Unknown mode '{}'. Use 'fail', 'skip', or 'overwrite'.",
                    other
                ),
            )),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ConflictMode::Fail => "fail",
            ConflictMode::Skip => "skip",
            ConflictMode::Overwrite => "overwrite",
        }
    }
}

/// Get all collection tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "docstore_collection_list",
            "List the collections in the configured project.",
            schema!(object {}),
        ),
        ToolDef::new(
            "docstore_collection_query",
            "Query documents in a collection. Filters are combined with AND; supports limit/offset paging \
             and a sort expression such as '-created_at'.",
            json!({
                "type": "object",
                "properties": {
                    "collection": {"type": "string"},
                    "filters": filters_schema(),
                    "limit": {"type": "integer", "minimum": 1, "maximum": 1000},
                    "offset": {"type": "integer", "minimum": 0},
                    "sort": {"type": "string"}
                },
                "required": ["collection"]
            }),
        ),
        ToolDef::new(
            "docstore_collection_import",
            "Bulk import documents into a collection. on_conflict decides what happens when an ID already \
             exists: 'fail' (default) aborts, 'skip' keeps the existing document, 'overwrite' replaces it. \
             id_field names the field to use as the document ID.",
            json!({
                "type": "object",
                "properties": {
                    "collection": {"type": "string"},
                    "documents": {"type": "array", "items": {"type": "object"}, "minItems": 1},
                    "on_conflict": {"type": "string", "enum": ["fail", "skip", "overwrite"], "default": "fail"},
                    "id_field": {"type": "string"}
                },
                "required": ["collection", "documents"]
            }),
        ),
        ToolDef::new(
            "docstore_collection_export",
            "Export all documents of a collection. The optional filter maps a field to a value (equality) \
             or to an object of operators, e.g. {\"age\": {\"$gte\": 18}, \"status\": \"active\"}. \
             Returns {collection, count, documents}.",
            json!({
                "type": "object",
                "properties": {
                    "collection": {"type": "string"},
                    "filter": {"type": "object"}
                },
                "required": ["collection"]
            }),
        ),
    ]
}

/// Dispatch a collection tool call.
pub async fn dispatch(
    ctx: &ToolContext,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<ToolResponse> {
    match name {
        "docstore_collection_list" => {
            let outcome = ctx
                .client()
                .call(ApiRequest::get(Vec::<String>::new()))
                .await;
            Ok(respond(name, outcome, &LIST, &Scope::new()))
        }

        "docstore_collection_query" => {
            let collection = get_string_arg(&args, "collection")?;
            let filters = parse_filters(&args, "filters")?;
            let limit = get_bounded_u64(&args, "limit", 1, 1000)?;
            let offset = get_optional_u64(&args, "offset")?;
            let sort = get_optional_string(&args, "sort")?;
            let scope = Scope::new().with("collection", &collection);

            let compiled = compile(&filters);
            let filter = (!compiled.is_empty()).then(|| JsonValue::Object(compiled).to_string());

            let request = ApiRequest::get([collection.as_str()])
                .query_opt("filter", filter)
                .query_opt("limit", limit)
                .query_opt("offset", offset)
                .query_opt("sort", sort);
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &QUERY, &scope))
        }

        "docstore_collection_import" => {
            let collection = get_string_arg(&args, "collection")?;
            let documents = get_array_arg(&args, "documents")?;
            if let Some(i) = documents.iter().position(|d| !d.is_object()) {
                return Err(McpError::invalid_arg(
                    format!("documents[{}]", i),
                    "Expected a JSON object",
                ));
            }
            let on_conflict = get_optional_string(&args, "on_conflict")?;
            let mode = ConflictMode::parse(on_conflict.as_deref())?;
            let id_field = get_optional_string(&args, "id_field")?;
            let scope = Scope::new().with("collection", &collection);

            let request = ApiRequest::post([collection.as_str(), "_import"])
                .query("onConflict", mode.as_str())
                .query_opt("idField", id_field)
                .body(json!({ "documents": documents }));
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &IMPORT, &scope))
        }

        "docstore_collection_export" => {
            let collection = get_string_arg(&args, "collection")?;
            let filter = get_optional_object(&args, "filter")?.unwrap_or_default();
            let scope = Scope::new().with("collection", &collection);

            let mut request = ApiRequest::get([collection.as_str(), "_export"]);
            for (key, value) in export_filter_params(&filter) {
                request = request.query(key, value);
            }
            let outcome = ctx
                .client()
                .call(request)
                .await
                .map(|payload| normalize_export(&collection, payload));
            Ok(respond(name, outcome, &EXPORT, &scope))
        }

        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

/// Flatten an export filter into bracketed query parameters.
///
/// `{"status": "active"}` becomes `filter[status]=active`,
/// `{"age": {"$gte": 18}}` becomes `filter[age][gte]=18`.
pub fn export_filter_params(filter: &Map<String, JsonValue>) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for (field, value) in filter {
        match value {
            JsonValue::Object(ops) => {
                for (op, operand) in ops {
                    let op = op.strip_prefix('$').unwrap_or(op);
                    params.push((format!("filter[{}][{}]", field, op), param_value(operand)));
                }
            }
            scalar => params.push((format!("filter[{}]", field), param_value(scalar))),
        }
    }
    params
}

fn param_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items.iter().map(param_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Shape an export payload as `{collection, count, documents}`.
pub fn normalize_export(collection: &str, payload: JsonValue) -> JsonValue {
    let documents = match payload {
        JsonValue::Array(docs) => docs,
        JsonValue::Object(mut obj) => match obj.remove("data") {
            Some(JsonValue::Array(docs)) => docs,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    json!({
        "collection": collection,
        "count": documents.len(),
        "documents": documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filter_params() {
        let filter = json!({
            "status": "active",
            "age": {"$gte": 18, "lt": 65},
            "verified": true,
            "tags": {"$in": ["a", "b"]}
        });
        let mut params = export_filter_params(filter.as_object().unwrap());
        params.sort();

        let expected: Vec<(String, String)> = vec![
            ("filter[age][gte]".into(), "18".into()),
            ("filter[age][lt]".into(), "65".into()),
            ("filter[status]".into(), "active".into()),
            ("filter[tags][in]".into(), "a,b".into()),
            ("filter[verified]".into(), "true".into()),
        ];
        assert_eq!(params, expected);
    }

    #[test]
    fn test_empty_export_filter() {
        assert!(export_filter_params(&Map::new()).is_empty());
    }

    #[test]
    fn test_normalize_export_shapes_agree() {
        let docs = json!([{"_id": "1"}, {"_id": "2"}]);
        let from_array = normalize_export("users", docs.clone());
        let from_object = normalize_export("users", json!({"data": docs, "cursor": null}));

        assert_eq!(from_array, from_object);
        assert_eq!(from_array["count"], 2);
        assert_eq!(from_array["collection"], "users");
    }

    #[test]
    fn test_normalize_export_other_shapes() {
        for payload in [json!({"items": []}), json!("nope"), json!({"data": "x"}), json!(null)] {
            let out = normalize_export("c", payload);
            assert_eq!(out["count"], 0);
            assert_eq!(out["documents"], json!([]));
        }
    }

    #[test]
    fn test_conflict_mode() {
        assert_eq!(ConflictMode::parse(None).unwrap(), ConflictMode::Fail);
        assert_eq!(
            ConflictMode::parse(Some("overwrite")).unwrap().as_str(),
            "overwrite"
        );
        assert!(ConflictMode::parse(Some("merge")).is_err());
    }
}

//! Webhook management tools.
//!
//! Tools: docstore_webhook_create, docstore_webhook_list, docstore_webhook_get,
//!        docstore_webhook_update, docstore_webhook_delete, docstore_webhook_test

use serde_json::{json, Map, Value as JsonValue};
use url::Url;

use crate::classify::{DecisionTable, Rule, Scope};
use crate::client::ApiRequest;
use crate::context::ToolContext;
use crate::convert::{get_optional_array, get_optional_bool, get_optional_string, get_string_arg};
use crate::error::{McpError, Result};
use crate::response::ToolResponse;
use crate::schema;
use crate::tools::{respond, ToolDef};

const FALLBACK_SUGGESTION: &str =
    "Check the collection name and webhook ID, then retry";

const NOT_FOUND: Rule = Rule::new(
    404,
    "WEBHOOK_NOT_FOUND",
    "Webhook '{webhook_id}' was not found on '{collection}'",
    "Use docstore_webhook_list to see the webhooks registered on '{collection}'",
);

const INVALID: Rule = Rule::new(
    400,
    "INVALID_WEBHOOK",
    "The webhook configuration was rejected: {message}",
    "Use a public http(s) URL and events from: document.created, document.updated, document.deleted",
);

const COLLECTION_NOT_FOUND: Rule = Rule::new(
    404,
    "COLLECTION_NOT_FOUND",
    "Collection '{collection}' does not exist",
    "Use docstore_collection_list to see the available collections",
);

const CREATE: DecisionTable = DecisionTable::new(
    "CREATE_WEBHOOK",
    &[
        Rule::new(
            403,
            "WEBHOOK_LIMIT",
            "No more webhooks can be registered: {message}",
            "Delete an unused webhook with docstore_webhook_delete, or reuse an existing one via docstore_webhook_update",
        ),
        INVALID,
        COLLECTION_NOT_FOUND,
    ],
    FALLBACK_SUGGESTION,
);

const LIST: DecisionTable =
    DecisionTable::new("LIST_WEBHOOKS", &[COLLECTION_NOT_FOUND], FALLBACK_SUGGESTION);

const GET: DecisionTable = DecisionTable::new("GET_WEBHOOK", &[NOT_FOUND], FALLBACK_SUGGESTION);

const UPDATE: DecisionTable =
    DecisionTable::new("UPDATE_WEBHOOK", &[NOT_FOUND, INVALID], FALLBACK_SUGGESTION);

const DELETE: DecisionTable =
    DecisionTable::new("DELETE_WEBHOOK", &[NOT_FOUND], FALLBACK_SUGGESTION);

const TEST: DecisionTable = DecisionTable::new(
    "TEST_WEBHOOK",
    &[
        NOT_FOUND,
        Rule::new(
            502,
            "WEBHOOK_DELIVERY_FAILED",
            "The test event could not be delivered: {message}",
            "Check that the webhook URL is reachable from the internet and answers with a 2xx status",
        ),
    ],
    FALLBACK_SUGGESTION,
);

/// Document lifecycle events a webhook can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A document was created.
    Created,
    /// A document was replaced or modified.
    Updated,
    /// A document was deleted.
    Deleted,
}

impl WebhookEvent {
    /// Every event, in wire order.
    pub const ALL: [WebhookEvent; 3] = [
        WebhookEvent::Created,
        WebhookEvent::Updated,
        WebhookEvent::Deleted,
    ];

    /// Parse a wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }

    /// Wire name, e.g. `document.created`.
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::Created => "document.created",
            WebhookEvent::Updated => "document.updated",
            WebhookEvent::Deleted => "document.deleted",
        }
    }
}

fn event_names() -> Vec<&'static str> {
    WebhookEvent::ALL.iter().map(WebhookEvent::as_str).collect()
}

/// Get all webhook tool definitions.
pub fn tools() -> Vec<ToolDef> {
    let events = json!({
        "type": "array",
        "minItems": 1,
        "items": {"type": "string", "enum": event_names()}
    });

    vec![
        ToolDef::new(
            "docstore_webhook_create",
            "Register a webhook that receives document events from a collection. \
             If a secret is given, deliveries are signed with it.",
            json!({
                "type": "object",
                "properties": {
                    "collection": {"type": "string"},
                    "url": {"type": "string", "format": "uri"},
                    "events": events,
                    "secret": {"type": "string"},
                    "enabled": {"type": "boolean", "default": true}
                },
                "required": ["collection", "url", "events"]
            }),
        ),
        ToolDef::new(
            "docstore_webhook_list",
            "List the webhooks registered on a collection.",
            schema!(object {
                required: { "collection": string }
            }),
        ),
        ToolDef::new(
            "docstore_webhook_get",
            "Get a webhook by ID.",
            schema!(object {
                required: { "collection": string, "webhook_id": string }
            }),
        ),
        ToolDef::new(
            "docstore_webhook_update",
            "Update a webhook. Only the fields provided are changed; at least one of url, events, \
             secret or enabled is required.",
            json!({
                "type": "object",
                "properties": {
                    "collection": {"type": "string"},
                    "webhook_id": {"type": "string"},
                    "url": {"type": "string", "format": "uri"},
                    "events": events,
                    "secret": {"type": "string"},
                    "enabled": {"type": "boolean"}
                },
                "required": ["collection", "webhook_id"]
            }),
        ),
        ToolDef::new(
            "docstore_webhook_delete",
            "Delete a webhook.",
            schema!(object {
                required: { "collection": string, "webhook_id": string }
            }),
        ),
        ToolDef::new(
            "docstore_webhook_test",
            "Send a test event to a webhook and report the delivery result.",
            schema!(object {
                required: { "collection": string, "webhook_id": string }
            }),
        ),
    ]
}

/// Dispatch a webhook tool call.
pub async fn dispatch(
    ctx: &ToolContext,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<ToolResponse> {
    match name {
        "docstore_webhook_create" => {
            let collection = get_string_arg(&args, "collection")?;
            let settings = parse_settings(&args)?;
            if !settings.contains_key("url") {
                return Err(McpError::MissingArg("url".to_string()));
            }
            if !settings.contains_key("events") {
                return Err(McpError::MissingArg("events".to_string()));
            }
            let scope = Scope::new().with("collection", &collection);

            let request = ApiRequest::post([collection.as_str(), "_webhooks"])
                .body(JsonValue::Object(settings));
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &CREATE, &scope))
        }

        "docstore_webhook_list" => {
            let collection = get_string_arg(&args, "collection")?;
            let scope = Scope::new().with("collection", &collection);

            let outcome = ctx
                .client()
                .call(ApiRequest::get([collection.as_str(), "_webhooks"]))
                .await;
            Ok(respond(name, outcome, &LIST, &scope))
        }

        "docstore_webhook_update" => {
            let collection = get_string_arg(&args, "collection")?;
            let webhook_id = get_string_arg(&args, "webhook_id")?;
            let settings = parse_settings(&args)?;
            if settings.is_empty() {
                return Err(McpError::invalid_arg(
                    "fields",
                    "Provide at least one of url, events, secret or enabled",
                ));
            }
            let scope = Scope::new()
                .with("collection", &collection)
                .with("webhook_id", &webhook_id);

            let request = ApiRequest::put([collection.as_str(), "_webhooks", webhook_id.as_str()])
                .body(JsonValue::Object(settings));
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, &UPDATE, &scope))
        }

        "docstore_webhook_get" | "docstore_webhook_delete" | "docstore_webhook_test" => {
            let collection = get_string_arg(&args, "collection")?;
            let webhook_id = get_string_arg(&args, "webhook_id")?;
            let scope = Scope::new()
                .with("collection", &collection)
                .with("webhook_id", &webhook_id);

            let path = [collection.as_str(), "_webhooks", webhook_id.as_str()];
            let (request, table) = match name {
                "docstore_webhook_get" => (ApiRequest::get(path), &GET),
                "docstore_webhook_delete" => (ApiRequest::delete(path), &DELETE),
                _ => (ApiRequest::post(path.into_iter().chain(["test"])), &TEST),
            };
            let outcome = ctx.client().call(request).await;
            Ok(respond(name, outcome, table, &scope))
        }

        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

/// Validate the optional webhook fields and collect the ones supplied.
fn parse_settings(args: &Map<String, JsonValue>) -> Result<Map<String, JsonValue>> {
    let mut settings = Map::new();

    if let Some(url) = get_optional_string(args, "url")? {
        validate_url(&url)?;
        settings.insert("url".to_string(), JsonValue::String(url));
    }

    if let Some(events) = get_optional_array(args, "events")? {
        settings.insert("events".to_string(), parse_events(&events)?);
    }

    if let Some(secret) = get_optional_string(args, "secret")? {
        settings.insert("secret".to_string(), JsonValue::String(secret));
    }

    if let Some(enabled) = get_optional_bool(args, "enabled")? {
        settings.insert("enabled".to_string(), JsonValue::Bool(enabled));
    }

    Ok(settings)
}

fn validate_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| McpError::invalid_arg("url", format!("'{}' is not a valid URL: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(McpError::invalid_arg("url", "URL must include a host")),
        other => Err(McpError::invalid_arg(
            "url",
            format!("Unsupported scheme '{}'. Use http or https.", other),
        )),
    }
}

fn parse_events(events: &[JsonValue]) -> Result<JsonValue> {
    if events.is_empty() {
        return Err(McpError::invalid_arg(
            "events",
            "Subscribe to at least one event",
        ));
    }

    let mut parsed = Vec::with_capacity(events.len());
    for (i, event) in events.iter().enumerate() {
        let event = event
            .as_str()
            .and_then(WebhookEvent::parse)
            .ok_or_else(|| {
                McpError::invalid_arg(
                    format!("events[{}]", i),
                    format!(
                        "Unknown event {}. Use one of: {}",
                        event,
                        event_names().join(", ")
                    ),
                )
            })?;
        if !parsed.contains(&event) {
            parsed.push(event);
        }
    }

    Ok(JsonValue::Array(
        parsed
            .iter()
            .map(|e| JsonValue::String(e.as_str().to_string()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(
            event_names(),
            vec!["document.created", "document.updated", "document.deleted"]
        );
        assert_eq!(WebhookEvent::parse("document.deleted"), Some(WebhookEvent::Deleted));
        assert_eq!(WebhookEvent::parse("collection.dropped"), None);
    }

    #[test]
    fn test_settings_only_contain_supplied_fields() {
        let settings = parse_settings(&args(json!({"enabled": false}))).unwrap();
        assert_eq!(JsonValue::Object(settings), json!({"enabled": false}));

        let settings = parse_settings(&args(json!({
            "url": "https://hooks.example.com/docstore",
            "events": ["document.created", "document.created", "document.deleted"],
            "secret": "whsec_1"
        })))
        .unwrap();
        assert_eq!(
            JsonValue::Object(settings),
            json!({
                "url": "https://hooks.example.com/docstore",
                "events": ["document.created", "document.deleted"],
                "secret": "whsec_1"
            })
        );
    }

    #[test]
    fn test_rejected_settings() {
        let cases = [
            json!({"url": "ftp://example.com/hook"}),
            json!({"url": "not a url"}),
            json!({"events": []}),
            json!({"events": ["document.archived"]}),
            json!({"events": [42]}),
            json!({"enabled": "yes"}),
        ];
        for case in cases {
            assert!(parse_settings(&args(case.clone())).is_err(), "{}", case);
        }
    }
}

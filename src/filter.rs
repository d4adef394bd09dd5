//! Filter compilation.
//!
//! Turns a list of `{field, operator, value}` triples into the query object
//! the Docstore API expects: `{"age": {"$gt": 30}, "status": "active"}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use crate::error::{McpError, Result};

/// Supported filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equality, compiled to the bare value.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Substring or array membership.
    Contains,
    /// Value is one of a list.
    In,
    /// Field presence.
    Exists,
}

impl FilterOperator {
    /// Every operator, in documentation order.
    pub const ALL: [FilterOperator; 9] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Contains,
        FilterOperator::In,
        FilterOperator::Exists,
    ];

    /// Parse an operator name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Contains => "contains",
            FilterOperator::In => "in",
            FilterOperator::Exists => "exists",
        }
    }
}

/// One filter condition as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Document field.
    pub field: String,
    /// Operator name. Unrecognized names compile as equality.
    pub operator: String,
    /// Operand.
    pub value: JsonValue,
}

impl FilterSpec {
    /// Create a filter condition.
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: JsonValue) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }
}

/// Compile filters into a query object.
///
/// Later conditions on the same field replace earlier ones.
pub fn compile(filters: &[FilterSpec]) -> Map<String, JsonValue> {
    let mut query = Map::new();
    for filter in filters {
        let compiled = match FilterOperator::parse(&filter.operator) {
            Some(FilterOperator::Eq) => filter.value.clone(),
            Some(op) => json!({ format!("${}", op.as_str()): filter.value }),
            None => {
                // Unknown operators match by equality.
                tracing::debug!(
                    field = %filter.field,
                    operator = %filter.operator,
                    "unrecognized filter operator, compiling as equality"
                );
                filter.value.clone()
            }
        };
        query.insert(filter.field.clone(), compiled);
    }
    query
}

/// JSON Schema for a filter list argument.
pub fn filters_schema() -> JsonValue {
    let operators: Vec<&str> = FilterOperator::ALL.iter().map(|op| op.as_str()).collect();
    json!({
        "type": "array",
        "description": "Conditions combined with AND. Later conditions on the same field replace earlier ones.",
        "items": {
            "type": "object",
            "properties": {
                "field": {"type": "string", "description": "Document field name"},
                "operator": {
                    "type": "string",
                    "enum": operators,
                    "description": "Comparison operator"
                },
                "value": {"description": "Value to compare against"}
            },
            "required": ["field", "operator", "value"]
        }
    })
}

/// Parse an optional filter list argument.
pub fn parse_filters(args: &Map<String, JsonValue>, name: &str) -> Result<Vec<FilterSpec>> {
    let arr = match args.get(name) {
        Some(JsonValue::Array(a)) => a,
        Some(JsonValue::Null) | None => return Ok(Vec::new()),
        _ => {
            return Err(McpError::invalid_arg(
                name,
                "Expected array of filter objects",
            ))
        }
    };

    let mut filters = Vec::with_capacity(arr.len());
    for (i, item) in arr.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| {
            McpError::invalid_arg(
                format!("{}[{}]", name, i),
                "Expected filter object with field, operator, and value",
            )
        })?;

        let field = obj
            .get("field")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                McpError::invalid_arg(format!("{}[{}].field", name, i), "Missing or invalid field")
            })?;

        let operator = obj
            .get("operator")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                McpError::invalid_arg(
                    format!("{}[{}].operator", name, i),
                    "Missing or invalid operator",
                )
            })?;

        let value = obj.get("value").cloned().ok_or_else(|| {
            McpError::invalid_arg(format!("{}[{}].value", name, i), "Missing value")
        })?;

        filters.push(FilterSpec::new(field, operator, value));
    }

    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_compiles_to_bare_value() {
        let compiled = compile(&[FilterSpec::new("status", "eq", json!("active"))]);
        assert_eq!(JsonValue::Object(compiled), json!({"status": "active"}));
    }

    #[test]
    fn test_operators_wrap_value() {
        for op in FilterOperator::ALL.iter().filter(|op| **op != FilterOperator::Eq) {
            let compiled = compile(&[FilterSpec::new("f", op.as_str(), json!([1, 2]))]);
            let expected = json!({ "f": { format!("${}", op.as_str()): [1, 2] } });
            assert_eq!(JsonValue::Object(compiled), expected, "operator {}", op.as_str());
        }
    }

    #[test]
    fn test_unknown_operator_falls_back_to_equality() {
        let compiled = compile(&[FilterSpec::new("age", "greater_than", json!(30))]);
        assert_eq!(JsonValue::Object(compiled), json!({"age": 30}));

        let compiled = compile(&[FilterSpec::new("age", "$gt", json!(30))]);
        assert_eq!(JsonValue::Object(compiled), json!({"age": 30}));
    }

    #[test]
    fn test_empty_input() {
        assert!(compile(&[]).is_empty());
    }

    #[test]
    fn test_distinct_fields_and_last_write_wins() {
        let compiled = compile(&[
            FilterSpec::new("age", "gte", json!(18)),
            FilterSpec::new("city", "eq", json!("Oslo")),
            FilterSpec::new("age", "lt", json!(65)),
        ]);
        assert_eq!(compiled.len(), 2);
        assert_eq!(compiled["age"], json!({"$lt": 65}));
        assert_eq!(compiled["city"], json!("Oslo"));
    }

    #[test]
    fn test_parse_filters() {
        let args = json!({
            "filters": [
                {"field": "age", "operator": "gt", "value": 3},
                {"field": "tags", "operator": "contains", "value": "x"}
            ]
        });
        let filters = parse_filters(args.as_object().unwrap(), "filters").unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0], FilterSpec::new("age", "gt", json!(3)));
    }

    #[test]
    fn test_parse_filters_absent() {
        let args = json!({"filters": null});
        assert!(parse_filters(args.as_object().unwrap(), "filters")
            .unwrap()
            .is_empty());
        assert!(parse_filters(&Map::new(), "filters").unwrap().is_empty());
    }

    #[test]
    fn test_parse_filters_rejects_malformed() {
        let args = json!({"filters": {"field": "a"}});
        assert!(parse_filters(args.as_object().unwrap(), "filters").is_err());

        let args = json!({"filters": [{"field": "a", "operator": "eq"}]});
        let err = parse_filters(args.as_object().unwrap(), "filters").unwrap_err();
        assert!(err.to_string().contains("filters[0].value"));

        let args = json!({"filters": [{"operator": "eq", "value": 1}]});
        assert!(parse_filters(args.as_object().unwrap(), "filters").is_err());
    }
}

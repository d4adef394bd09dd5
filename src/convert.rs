//! Argument extraction helpers for tool handlers.
//!
//! Absent or `null` arguments count as missing. Present arguments of the
//! wrong type are reported as invalid rather than missing.

use serde_json::{Map, Value as JsonValue};

use crate::error::{McpError, Result};

fn typed<'a, T>(
    args: &'a Map<String, JsonValue>,
    name: &str,
    expected: &str,
    extract: impl Fn(&'a JsonValue) -> Option<T>,
) -> Result<Option<T>> {
    match args.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => extract(value)
            .map(Some)
            .ok_or_else(|| McpError::invalid_arg(name, format!("expected {}", expected))),
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| McpError::MissingArg(name.to_string()))
}

/// Helper to get a required, non-blank string argument.
pub fn get_string_arg(args: &Map<String, JsonValue>, name: &str) -> Result<String> {
    let value = required(get_optional_string(args, name)?, name)?;
    if value.trim().is_empty() {
        return Err(McpError::invalid_arg(name, "must not be empty"));
    }
    Ok(value)
}

/// Helper to get an optional string argument.
pub fn get_optional_string(args: &Map<String, JsonValue>, name: &str) -> Result<Option<String>> {
    typed(args, name, "a string", |v| v.as_str().map(str::to_string))
}

/// Helper to get an optional u64 argument.
pub fn get_optional_u64(args: &Map<String, JsonValue>, name: &str) -> Result<Option<u64>> {
    typed(args, name, "a non-negative integer", JsonValue::as_u64)
}

/// Helper to get an optional u64 argument constrained to `min..=max`.
pub fn get_bounded_u64(
    args: &Map<String, JsonValue>,
    name: &str,
    min: u64,
    max: u64,
) -> Result<Option<u64>> {
    match get_optional_u64(args, name)? {
        Some(n) if n < min || n > max => Err(McpError::invalid_arg(
            name,
            format!("must be between {} and {}", min, max),
        )),
        other => Ok(other),
    }
}

/// Helper to get a required integer argument that is at least 1.
pub fn get_positive_u64(args: &Map<String, JsonValue>, name: &str) -> Result<u64> {
    let n = required(
        typed(args, name, "a positive integer", JsonValue::as_u64)?,
        name,
    )?;
    if n == 0 {
        return Err(McpError::invalid_arg(name, "must be a positive integer"));
    }
    Ok(n)
}

/// Helper to get an optional number argument.
pub fn get_optional_f64(args: &Map<String, JsonValue>, name: &str) -> Result<Option<f64>> {
    typed(args, name, "a number", JsonValue::as_f64)
}

/// Helper to get an optional boolean argument.
pub fn get_optional_bool(args: &Map<String, JsonValue>, name: &str) -> Result<Option<bool>> {
    typed(args, name, "a boolean", JsonValue::as_bool)
}

/// Helper to get a required JSON object argument.
pub fn get_object_arg(
    args: &Map<String, JsonValue>,
    name: &str,
) -> Result<Map<String, JsonValue>> {
    required(get_optional_object(args, name)?, name)
}

/// Helper to get an optional JSON object argument.
pub fn get_optional_object(
    args: &Map<String, JsonValue>,
    name: &str,
) -> Result<Option<Map<String, JsonValue>>> {
    typed(args, name, "an object", |v| v.as_object().cloned())
}

/// Helper to get a required, non-empty array argument.
pub fn get_array_arg(args: &Map<String, JsonValue>, name: &str) -> Result<Vec<JsonValue>> {
    let arr = required(get_optional_array(args, name)?, name)?;
    if arr.is_empty() {
        return Err(McpError::invalid_arg(name, "must contain at least one element"));
    }
    Ok(arr)
}

/// Helper to get an optional array argument.
pub fn get_optional_array(
    args: &Map<String, JsonValue>,
    name: &str,
) -> Result<Option<Vec<JsonValue>>> {
    typed(args, name, "an array", |v| v.as_array().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_missing_vs_invalid() {
        let a = args(json!({"id": 5, "name": null}));
        assert!(matches!(
            get_string_arg(&a, "other"),
            Err(McpError::MissingArg(_))
        ));
        assert!(matches!(
            get_string_arg(&a, "name"),
            Err(McpError::MissingArg(_))
        ));
        assert!(matches!(
            get_string_arg(&a, "id"),
            Err(McpError::InvalidArg { .. })
        ));
    }

    #[test]
    fn test_blank_string_rejected() {
        let a = args(json!({"id": "  "}));
        assert!(get_string_arg(&a, "id").is_err());
    }

    #[test]
    fn test_bounded_and_positive() {
        let a = args(json!({"limit": 500, "version": 0, "from": 3}));
        assert!(get_bounded_u64(&a, "limit", 1, 100).is_err());
        assert_eq!(get_bounded_u64(&a, "limit", 1, 1000).unwrap(), Some(500));
        assert_eq!(get_bounded_u64(&a, "absent", 1, 10).unwrap(), None);
        assert!(get_positive_u64(&a, "version").is_err());
        assert_eq!(get_positive_u64(&a, "from").unwrap(), 3);

        let a = args(json!({"version": -2}));
        assert!(matches!(
            get_positive_u64(&a, "version"),
            Err(McpError::InvalidArg { .. })
        ));
    }

    #[test]
    fn test_objects_and_arrays() {
        let a = args(json!({"data": {"a": 1}, "docs": [], "list": [1]}));
        assert_eq!(get_object_arg(&a, "data").unwrap()["a"], json!(1));
        assert!(get_object_arg(&a, "list").is_err());
        assert!(get_array_arg(&a, "docs").is_err());
        assert_eq!(get_array_arg(&a, "list").unwrap(), vec![json!(1)]);
    }
}

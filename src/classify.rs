//! Per-operation classification of failed API calls.
//!
//! Each tool owns a [`DecisionTable`]: an ordered list of status rules that
//! map an [`ApiError`] to a stable error code plus a suggestion the calling
//! agent can act on. Anything no rule matches falls back to
//! `<OPERATION>_FAILED` carrying the upstream message.

use crate::client::ApiError;
use crate::response::{format_error, ToolResponse};

/// One row of a decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// HTTP status this rule applies to.
    pub status: u16,
    /// Error code reported to the caller.
    pub code: &'static str,
    /// Message template.
    pub message: &'static str,
    /// Suggestion template.
    pub suggestion: &'static str,
}

impl Rule {
    /// Create a rule.
    pub const fn new(
        status: u16,
        code: &'static str,
        message: &'static str,
        suggestion: &'static str,
    ) -> Self {
        Self {
            status,
            code,
            message,
            suggestion,
        }
    }

    /// Whether this rule applies to the given status.
    pub fn matches(&self, status: u16) -> bool {
        self.status == status
    }
}

/// Applies to every table after its own rules.
static UNAUTHORIZED: Rule = Rule::new(
    401,
    "UNAUTHORIZED",
    "The Docstore API rejected the API key: {message}",
    "Check that DOCSTORE_API_KEY holds a valid, unrevoked API key for this project",
);

/// Ordered status rules for one operation.
#[derive(Debug, Clone, Copy)]
pub struct DecisionTable {
    operation: &'static str,
    rules: &'static [Rule],
    suggestion: &'static str,
}

impl DecisionTable {
    /// Create a table. `operation` is the fallback code prefix, `suggestion`
    /// the fallback suggestion.
    pub const fn new(
        operation: &'static str,
        rules: &'static [Rule],
        suggestion: &'static str,
    ) -> Self {
        Self {
            operation,
            rules,
            suggestion,
        }
    }

    /// Operation name, e.g. `CREATE_DOCUMENT`.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Code used when no rule matches.
    pub fn fallback_code(&self) -> String {
        format!("{}_FAILED", self.operation)
    }

    /// The rules, in evaluation order.
    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    /// First rule matching `status`, including the shared 401 rule.
    pub fn rule_for(&self, status: u16) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|rule| rule.matches(status))
            .or_else(|| UNAUTHORIZED.matches(status).then_some(&UNAUTHORIZED))
    }

    /// Classify a failed call.
    pub fn classify(&self, err: &ApiError, scope: &Scope) -> Classified {
        let upstream = err.message();
        match err.status().and_then(|status| self.rule_for(status)) {
            Some(rule) => Classified {
                code: rule.code.to_string(),
                message: scope.render(rule.message, upstream),
                suggestion: scope.render(rule.suggestion, upstream),
            },
            None => Classified {
                code: self.fallback_code(),
                message: upstream.to_string(),
                suggestion: scope.render(self.suggestion, upstream),
            },
        }
    }
}

/// Classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// Error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Remediation hint.
    pub suggestion: String,
}

impl Classified {
    /// Format as an error tool response.
    pub fn into_response(self) -> ToolResponse {
        format_error(&self.code, &self.message, &self.suggestion)
    }
}

/// Values substituted into `{name}` placeholders of a template.
///
/// `{message}` is always the upstream message and is substituted last.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: Vec<(&'static str, String)>,
}

impl Scope {
    /// Empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.vars.push((name, value.to_string()));
        self
    }

    /// Render a template.
    pub fn render(&self, template: &str, message: &str) -> String {
        let mut out = template.to_string();
        for (name, value) in &self.vars {
            out = out.replace(&format!("{{{}}}", name), value);
        }
        out.replace("{message}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::UpstreamFailure;
    use serde_json::json;

    const TABLE: DecisionTable = DecisionTable::new(
        "GET_THING",
        &[
            Rule::new(404, "THING_NOT_FOUND", "No thing '{id}' in '{collection}'", "List things in '{collection}'"),
            Rule::new(400, "VALIDATION_ERROR", "{message}", "Fix the input"),
            Rule::new(404, "SHADOWED", "never", "never"),
        ],
        "Retry later",
    );

    fn upstream(status: u16, message: &str) -> ApiError {
        ApiError::Upstream(UpstreamFailure {
            status,
            message: message.to_string(),
            body: json!({}),
        })
    }

    fn scope() -> Scope {
        Scope::new().with("collection", "users").with("id", "u1")
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let c = TABLE.classify(&upstream(404, "nope"), &scope());
        assert_eq!(c.code, "THING_NOT_FOUND");
        assert_eq!(c.message, "No thing 'u1' in 'users'");
        assert_eq!(c.suggestion, "List things in 'users'");
    }

    #[test]
    fn test_upstream_message_placeholder() {
        let c = TABLE.classify(&upstream(400, "age must be a number"), &scope());
        assert_eq!(c.code, "VALIDATION_ERROR");
        assert_eq!(c.message, "age must be a number");
    }

    #[test]
    fn test_fallback_uses_upstream_message() {
        let c = TABLE.classify(&upstream(500, "boom"), &scope());
        assert_eq!(c.code, "GET_THING_FAILED");
        assert_eq!(c.message, "boom");
        assert_eq!(c.suggestion, "Retry later");
    }

    #[test]
    fn test_transport_errors_fall_back() {
        let err = ApiError::Transport("connection refused".to_string());
        let c = TABLE.classify(&err, &scope());
        assert_eq!(c.code, "GET_THING_FAILED");
        assert_eq!(c.message, "connection refused");
    }

    #[test]
    fn test_shared_unauthorized_rule() {
        let c = TABLE.classify(&upstream(401, "invalid key"), &Scope::new());
        assert_eq!(c.code, "UNAUTHORIZED");
        assert!(c.message.contains("invalid key"));
    }

    #[test]
    fn test_message_braces_are_not_rendered() {
        let c = TABLE.classify(&upstream(400, "bad {id}"), &scope());
        assert_eq!(c.message, "bad {id}");
    }

    #[test]
    fn test_into_response() {
        let response = TABLE.classify(&upstream(404, "x"), &scope()).into_response();
        assert!(response.is_error());
        assert_eq!(response.error_code().as_deref(), Some("THING_NOT_FOUND"));
    }
}

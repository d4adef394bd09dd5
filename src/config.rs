//! Process configuration.
//!
//! Credentials and the target project are resolved once at startup into an
//! immutable [`Config`]. Tool handlers receive it by reference and never look
//! at the environment themselves.

use std::time::Duration;

use url::Url;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "DOCSTORE_API_KEY";
/// Environment variable holding the project namespace.
pub const PROJECT_VAR: &str = "DOCSTORE_PROJECT";
/// Older name for [`PROJECT_VAR`], still honored.
pub const PROJECT_ALIAS_VAR: &str = "DOCSTORE_NAMESPACE";
/// Environment variable overriding the API base URL.
pub const BASE_URL_VAR: &str = "DOCSTORE_API_URL";
/// Environment variable overriding the outbound request timeout.
pub const TIMEOUT_VAR: &str = "DOCSTORE_TIMEOUT_SECS";

/// Default Docstore API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.docstore.dev/v1";
/// Default project namespace.
pub const DEFAULT_PROJECT: &str = "default";
/// Default outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Startup configuration failures. All of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No API key was supplied.
    #[error("DOCSTORE_API_KEY is not set. Create an API key in the Docstore dashboard and export it as DOCSTORE_API_KEY before starting the server")]
    MissingApiKey,

    /// The base URL is not an absolute http(s) URL.
    #[error("invalid DOCSTORE_API_URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected value
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The timeout is not a positive number of seconds.
    #[error("invalid DOCSTORE_TIMEOUT_SECS '{0}': expected a positive number of seconds")]
    InvalidTimeout(String),
}

/// Immutable connection settings shared by every tool call.
#[derive(Clone)]
pub struct Config {
    api_key: String,
    project: String,
    base_url: Url,
    timeout: Duration,
}

impl Config {
    /// Build a configuration directly.
    pub fn new(
        api_key: impl Into<String>,
        project: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key,
            project: project.into(),
            base_url: parse_base_url(base_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::MissingApiKey)?;
        let project = get(PROJECT_VAR)
            .or_else(|| get(PROJECT_ALIAS_VAR))
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string());
        let base_url = get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match get(TIMEOUT_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_key: api_key.trim().to_string(),
            project: project.trim().to_string(),
            base_url: parse_base_url(base_url.trim())?,
            timeout,
        })
    }

    /// Copy of this configuration using a different API key.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..self.clone()
        }
    }

    /// Copy of this configuration using a different outbound timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The bearer credential attached to outbound calls.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The project namespace every path is rooted at.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The outbound request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("project", &self.project)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::from_lookup(lookup(&[(PROJECT_VAR, "shop")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let err = Config::from_lookup(lookup(&[(API_KEY_VAR, "   ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[(API_KEY_VAR, "sk_test")])).unwrap();
        assert_eq!(config.api_key(), "sk_test");
        assert_eq!(config.project(), DEFAULT_PROJECT);
        assert_eq!(config.base_url().as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_project_alias() {
        let config = Config::from_lookup(lookup(&[
            (API_KEY_VAR, "sk_test"),
            (PROJECT_ALIAS_VAR, "legacy"),
        ]))
        .unwrap();
        assert_eq!(config.project(), "legacy");

        let config = Config::from_lookup(lookup(&[
            (API_KEY_VAR, "sk_test"),
            (PROJECT_VAR, "primary"),
            (PROJECT_ALIAS_VAR, "legacy"),
        ]))
        .unwrap();
        assert_eq!(config.project(), "primary");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = Config::from_lookup(lookup(&[
            (API_KEY_VAR, "sk_test"),
            (BASE_URL_VAR, "ftp://example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let err = Config::from_lookup(lookup(&[(API_KEY_VAR, "k"), (BASE_URL_VAR, "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = Config::from_lookup(lookup(&[(API_KEY_VAR, "k"), (TIMEOUT_VAR, "0")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("0".to_string()));

        let config =
            Config::from_lookup(lookup(&[(API_KEY_VAR, "k"), (TIMEOUT_VAR, "5")])).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_with_api_key_keeps_the_rest() {
        let config = Config::new("original", "shop", "http://localhost:8080/v1").unwrap();
        let swapped = config.with_api_key("per-request");
        assert_eq!(swapped.api_key(), "per-request");
        assert_eq!(swapped.project(), "shop");
        assert_eq!(config.api_key(), "original");
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = Config::new("sk_secret", "shop", "http://localhost").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk_secret"));
    }
}

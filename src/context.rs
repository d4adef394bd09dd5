//! Per-call handler context.
//!
//! Holds the immutable configuration and the REST client bound to it. Tool
//! handlers are functions of `(&ToolContext, arguments)`.

use std::sync::Arc;

use crate::client::{http_client, RestClient};
use crate::config::Config;

/// Everything a tool handler needs to reach the Docstore API.
#[derive(Clone)]
pub struct ToolContext {
    config: Arc<Config>,
    client: RestClient,
}

impl ToolContext {
    /// Create a context from a configuration and a shared HTTP client.
    pub fn new(config: Arc<Config>, http: reqwest::Client) -> Self {
        let client = RestClient::new(http, Arc::clone(&config));
        Self { config, client }
    }

    /// Create a context with its own HTTP client.
    pub fn from_config(config: Config) -> reqwest::Result<Self> {
        let http = http_client(&config)?;
        Ok(Self::new(Arc::new(config), http))
    }

    /// The configuration in effect for this context.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The REST client.
    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// A context authenticating with a different API key.
    ///
    /// The connection pool is shared; the original context is unchanged.
    pub fn with_api_key(&self, api_key: &str) -> Self {
        let config = Arc::new(self.config.with_api_key(api_key));
        Self {
            client: self.client.with_config(Arc::clone(&config)),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_api_key_shares_everything_else() {
        let config = Config::new("sk_one", "shop", "http://localhost:9/v1").unwrap();
        let ctx = ToolContext::new(Arc::new(config), reqwest::Client::new());
        let other = ctx.with_api_key("sk_two");

        assert_eq!(ctx.config().api_key(), "sk_one");
        assert_eq!(other.config().api_key(), "sk_two");
        assert_eq!(other.client().config().api_key(), "sk_two");
        assert_eq!(other.config().project(), "shop");
    }
}

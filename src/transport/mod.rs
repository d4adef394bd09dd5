//! Transports the MCP server can be reached over.

pub mod http;
pub mod session;

use std::fmt;

/// How clients connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout.
    #[default]
    Stdio,
    /// Stateless streamable HTTP on `POST /mcp`.
    Http,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => f.write_str("stdio"),
            Transport::Http => f.write_str("http"),
        }
    }
}

impl Transport {
    /// Log level used when neither `--verbose` nor `RUST_LOG` is set.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Transport::Stdio => "warn",
            Transport::Http => "info",
        }
    }
}

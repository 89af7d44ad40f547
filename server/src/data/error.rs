//! Unified error type for the data layer
//!
//! Covers transport, protocol, and store-reported failures of the graph
//! store client.

use thiserror::Error;

/// Name reported for errors raised by the graph store client
pub const BACKEND: &str = "neo4j";

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Transport-level failure talking to the graph store
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the graph store
    #[error("Graph store returned status {status}: {body}")]
    GraphStatus { status: u16, body: String },

    /// Error reported by the graph store inside a successful response
    #[error("Graph error {code}: {message}")]
    Graph { code: String, message: String },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query timeout
    #[error("Query timeout after {timeout_secs}s on {backend}")]
    Timeout {
        backend: &'static str,
        timeout_secs: u64,
    },
}

impl DataError {
    pub fn graph(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Graph {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout {
            backend: BACKEND,
            timeout_secs,
        }
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::GraphStatus { status, .. } => matches!(status, 502..=504),
            // Neo4j classifies retryable failures as `Neo.TransientError.*`
            Self::Graph { code, .. } => code.contains(".TransientError."),
            Self::Decode(_) | Self::Config(_) => false,
        }
    }
}

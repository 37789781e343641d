//! Error types for txt2sql.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for txt2sql operations.
#[derive(Error, Debug)]
pub enum Txt2SqlError {
    /// Database connection errors (host unreachable, auth failed, probe failed).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, unknown tables, rejected statements).
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API errors (rate limits, auth, network failures, malformed responses).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Tool loop errors (no final answer within the attempt budget).
    #[error("Agent error: {0}")]
    Agent(String),

    /// Configuration errors (missing environment variables, invalid config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Txt2SqlError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates an agent error with the given message.
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Creates the configuration error reported when required settings are absent.
    pub fn missing_settings(names: &[&str]) -> Self {
        Self::Config(format!(
            "Missing required environment variables: {}",
            names.join(", ")
        ))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Agent(_) => "Agent Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using Txt2SqlError.
pub type Result<T> = std::result::Result<T, Txt2SqlError>;

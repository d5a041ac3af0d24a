//! Error types for the chat system

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that end a conversation turn early
#[derive(Debug, Error)]
pub enum ChatError {
    /// Nothing to answer
    #[error("Empty input")]
    EmptyInput,

    /// Rejected by the safety screen
    #[error("Blocked by policy: {}", .0.as_deref().unwrap_or("no reason given"))]
    BlockedByPolicy(Option<String>),

    /// Model or graph store unreachable, failing, or timed out
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The model emitted tool arguments that could not be used
    #[error("Malformed tool call: {0}")]
    MalformedToolCall(String),

    /// The model asked for a tool that does not exist
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool failed in a way the model cannot recover from
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// The model kept requesting tools past the round cap
    #[error("Tool round limit ({0}) exceeded")]
    ToolRoundLimitExceeded(u32),
}

/// Serializable classification of a [`ChatError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyInput,
    BlockedByPolicy,
    UpstreamUnavailable,
    MalformedToolCall,
    UnknownTool,
    ToolExecution,
    ToolRoundLimitExceeded,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::EmptyInput => ErrorKind::EmptyInput,
            ChatError::BlockedByPolicy(_) => ErrorKind::BlockedByPolicy,
            ChatError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            ChatError::MalformedToolCall(_) => ErrorKind::MalformedToolCall,
            ChatError::UnknownTool(_) => ErrorKind::UnknownTool,
            ChatError::ToolExecution(_) => ErrorKind::ToolExecution,
            ChatError::ToolRoundLimitExceeded(_) => ErrorKind::ToolRoundLimitExceeded,
        }
    }

    /// Message shown to the user and recorded as the assistant turn
    pub fn user_message(&self) -> String {
        match self {
            ChatError::EmptyInput => "Please enter a message.".to_string(),
            ChatError::BlockedByPolicy(reason) => match reason {
                Some(reason) => format!("I can't help with that request: {}", reason),
                None => "I can't help with that request.".to_string(),
            },
            ChatError::UpstreamUnavailable(_) => {
                "Sorry, I couldn't reach the language model right now. Please try again in a moment."
                    .to_string()
            }
            ChatError::MalformedToolCall(_) | ChatError::UnknownTool(_) => {
                "Sorry, something went wrong while looking up the answer. Please try rephrasing your question."
                    .to_string()
            }
            ChatError::ToolExecution(_) => {
                "Sorry, the database lookup failed and I couldn't produce an answer.".to_string()
            }
            ChatError::ToolRoundLimitExceeded(_) => {
                "Sorry, I couldn't finish looking up the answer. Please try a simpler question."
                    .to_string()
            }
        }
    }
}

/// Errors specific to LLM provider operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited
    #[error("Rate limited")]
    RateLimited,

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Content filtered
    #[error("Content filtered by safety system")]
    ContentFiltered,

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        ChatError::UpstreamUnavailable(err.to_string())
    }
}

/// Errors from the graph store, fed back to the model as structured payloads
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The query was empty or rejected as syntactically invalid
    #[error("Malformed SPARQL query: {0}")]
    Malformed(String),

    /// The store could not be reached
    #[error("Graph store unreachable: {0}")]
    Unreachable(String),

    /// The store accepted the request but failed to evaluate it
    #[error("Graph store error: {status} - {message}")]
    Store { status: u16, message: String },

    /// The store answered with something that is not a SPARQL result document
    #[error("Unreadable query result: {0}")]
    Parse(String),

    /// No answer within the configured timeout
    #[error("Query timed out after {0}s")]
    Timeout(u64),

    /// The ontology description could not be loaded
    #[error("Ontology unavailable: {0}")]
    Ontology(String),
}

impl QueryError {
    /// Short machine-readable label used in the error payload
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Malformed(_) => "malformed_query",
            QueryError::Unreachable(_) => "store_unreachable",
            QueryError::Store { .. } => "store_error",
            QueryError::Parse(_) => "invalid_response",
            QueryError::Timeout(_) => "timeout",
            QueryError::Ontology(_) => "ontology_unavailable",
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QueryError::Timeout(0)
        } else {
            QueryError::Unreachable(err.to_string())
        }
    }
}

/// Result type alias for turn operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Result type alias for graph store operations
pub type StoreResult<T> = Result<T, QueryError>;

//! Configuration types for the chat core

use serde::{Deserialize, Serialize};

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmProviderConfig {
    /// Provider type
    #[serde(default)]
    pub provider: LlmProviderType,
    /// Model name (deployment name for Azure)
    pub model: String,
    /// Environment variable containing the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Custom base URL (Azure resource endpoint, proxies, self-hosted gateways)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Azure OpenAI `api-version` query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Default temperature for completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Default max completion tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Reasoning effort for reasoning models ("minimal", "low", "medium", "high")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    /// HTTP request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

fn default_llm_timeout() -> u64 {
    60
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// OpenAI or any OpenAI-compatible endpoint
    #[default]
    OpenAI,
    /// Azure OpenAI
    #[serde(alias = "azure")]
    AzureOpenAI,
}

impl std::fmt::Display for LlmProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProviderType::OpenAI => write!(f, "openai"),
            LlmProviderType::AzureOpenAI => write!(f, "azure"),
        }
    }
}

/// Safety screen configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuardrailConfig {
    /// Dedicated (usually cheaper) model for screening; the main model is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmProviderConfig>,
    /// Inputs longer than this are blocked without a model call
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Timeout for the screening call in seconds
    #[serde(default = "default_guardrail_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            llm: None,
            max_input_chars: default_max_input_chars(),
            timeout_seconds: default_guardrail_timeout(),
        }
    }
}

fn default_max_input_chars() -> usize {
    2000
}

fn default_guardrail_timeout() -> u64 {
    20
}

/// SPARQL endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphStoreConfig {
    /// Base URL of the store (e.g. a GraphDB server)
    #[serde(default = "default_graph_url")]
    pub url: String,
    /// Repository holding the knowledge graph
    #[serde(default = "default_repository")]
    pub repository: String,
    /// Request timeout in seconds
    #[serde(default = "default_query_timeout")]
    pub timeout_seconds: u64,
    /// Maximum number of result rows handed to the model
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            url: default_graph_url(),
            repository: default_repository(),
            timeout_seconds: default_query_timeout(),
            max_rows: default_max_rows(),
        }
    }
}

impl GraphStoreConfig {
    /// SPARQL protocol endpoint of the repository
    pub fn endpoint(&self) -> String {
        format!(
            "{}/repositories/{}",
            self.url.trim_end_matches('/'),
            self.repository
        )
    }
}

fn default_graph_url() -> String {
    "http://localhost:7200".to_string()
}

fn default_repository() -> String {
    "Jaguars".to_string()
}

fn default_query_timeout() -> u64 {
    30
}

fn default_max_rows() -> usize {
    200
}

/// Where the ontology description comes from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum OntologyConfig {
    /// Text embedded in the configuration
    Inline { text: String },
    /// A file (Turtle, OWL, or prose) read on demand
    File {
        path: String,
        #[serde(default = "default_refresh_seconds")]
        refresh_seconds: u64,
    },
    /// Classes and properties discovered by querying the store
    Introspect {
        #[serde(default = "default_refresh_seconds")]
        refresh_seconds: u64,
    },
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self::Introspect {
            refresh_seconds: default_refresh_seconds(),
        }
    }
}

fn default_refresh_seconds() -> u64 {
    3600
}

/// Orchestration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Subject the assistant is restricted to
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Replacement system prompt (Tera template, `{{ domain }}` is available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Model calls that may request tools before the answer is forced
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Timeout for each model call in seconds
    #[serde(default = "default_model_timeout")]
    pub model_timeout_seconds: u64,
    /// Timeout for each tool execution in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_seconds: u64,
    /// Idle sessions older than this are dropped
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// How much history is replayed to the model
    #[serde(default)]
    pub memory: MemoryStrategy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            system_prompt: None,
            max_tool_rounds: default_max_tool_rounds(),
            model_timeout_seconds: default_model_timeout(),
            tool_timeout_seconds: default_tool_timeout(),
            session_ttl_seconds: default_session_ttl(),
            memory: MemoryStrategy::default(),
        }
    }
}

fn default_domain() -> String {
    "jaguars".to_string()
}

fn default_max_tool_rounds() -> u32 {
    2
}

fn default_model_timeout() -> u64 {
    90
}

fn default_tool_timeout() -> u64 {
    30
}

fn default_session_ttl() -> u64 {
    3600
}

/// Memory management strategies for the replayed transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryStrategy {
    /// Replay the whole history
    #[default]
    Full,
    /// Replay only the most recent messages
    SlidingWindow {
        /// Number of messages to keep
        size: usize,
    },
}

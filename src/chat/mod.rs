//! Conversational access to a knowledge graph
//!
//! This module answers user questions with a language model that may query a
//! SPARQL store through tool calls:
//! - Every input is screened before any state changes
//! - Answers are grounded in the graph's ontology and query results
//! - Histories are kept per session, in memory, with idle expiry
//!
//! ## Architecture
//!
//! - `domain/` - Core types (Message, ChatMessage, ToolCall, TurnOutcome)
//! - `llm/` - Chat-completion providers (OpenAI, Azure OpenAI)
//! - `tools/` - SPARQL client, ontology provider and tool dispatch
//! - `guardrail` - Input safety screen
//! - `core/` - Turn state machine and answer formatting
//! - `memory/` - Session storage

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod guardrail;
pub mod handler;
pub mod llm;
pub mod memory;
pub mod tools;

// Re-export commonly used types
pub use config::*;
pub use domain::*;
pub use error::*;
pub use handler::ChatHandler;

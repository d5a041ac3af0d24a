//! Domain types for the chat system
//!
//! Core abstractions that define the conversation model.

mod message;
mod outcome;
mod tool_call;

pub use message::*;
pub use outcome::*;
pub use tool_call::*;

use async_trait::async_trait;

/// Port trait for conversation operations, consumed by the HTTP layer
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Process one user message for a session
    async fn submit_turn(&self, session_id: &str, message: &str) -> anyhow::Result<TurnOutcome>;

    /// Empty a session's history
    async fn clear_history(&self, session_id: &str) -> anyhow::Result<()>;

    /// Ordered history of a session (empty for unknown sessions)
    async fn get_history(&self, session_id: &str) -> anyhow::Result<Vec<ChatMessage>>;

    /// Tear a session down entirely
    async fn delete_session(&self, session_id: &str) -> anyhow::Result<()>;

    /// Drop sessions idle for longer than the configured TTL
    async fn purge_expired(&self) -> anyhow::Result<usize>;
}

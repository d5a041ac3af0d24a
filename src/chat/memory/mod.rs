//! Session storage for conversation histories
//!
//! Histories live in memory only. Each session's history sits behind its own
//! mutex so that concurrent requests for the same session are serialized,
//! while different sessions proceed independently.

mod in_memory;
mod strategy;

pub use in_memory::InMemorySessionStore;
pub use strategy::apply_strategy;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chat::domain::ConversationHistory;

/// A session's history, shared between the store and the in-flight turn
pub type SharedHistory = Arc<Mutex<ConversationHistory>>;

/// Trait for session storage backends
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session's history, creating an empty one on first use
    async fn get_or_create(&self, session_id: &str) -> SharedHistory;

    /// Fetch a session's history without creating it
    async fn get(&self, session_id: &str) -> Option<SharedHistory>;

    /// Drop a session; returns whether it existed
    async fn remove(&self, session_id: &str) -> bool;

    /// Drop idle sessions; returns how many were removed
    async fn purge_expired(&self) -> usize;

    /// Number of live sessions
    async fn session_count(&self) -> usize;
}

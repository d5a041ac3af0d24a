//! In-memory session store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use super::{SessionStore, SharedHistory};
use crate::chat::domain::ConversationHistory;

struct SessionEntry {
    history: SharedHistory,
    last_active: Instant,
}

/// In-memory session store with idle expiry
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    /// Create a new store; sessions idle for longer than `ttl` can be purged
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, session_id: &str) -> SharedHistory {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "Creating session");
                SessionEntry {
                    history: Arc::new(Mutex::new(ConversationHistory::new())),
                    last_active: Instant::now(),
                }
            });
        entry.last_active = Instant::now();
        entry.history.clone()
    }

    async fn get(&self, session_id: &str) -> Option<SharedHistory> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(session_id).map(|entry| {
            entry.last_active = Instant::now();
            entry.history.clone()
        })
    }

    async fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).is_some()
    }

    async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        // A session whose history is locked has a turn in flight
        sessions.retain(|_, entry| {
            entry.last_active.elapsed() < self.ttl || entry.history.try_lock().is_err()
        });

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "Purged expired sessions");
        }
        removed
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

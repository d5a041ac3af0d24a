//! Memory management strategies for the replayed transcript

use crate::chat::config::MemoryStrategy;
use crate::chat::domain::{ChatMessage, Message};

/// Select the history messages replayed to the model
pub fn apply_strategy(messages: &[ChatMessage], strategy: &MemoryStrategy) -> Vec<Message> {
    let selected = match strategy {
        MemoryStrategy::Full => messages,
        MemoryStrategy::SlidingWindow { size } => {
            let take_from = messages.len().saturating_sub(*size);
            &messages[take_from..]
        }
    };

    selected.iter().map(ChatMessage::to_transcript).collect()
}

//! Turn outcomes and safety verdicts

use serde::{Deserialize, Serialize};

use crate::chat::error::ErrorKind;

/// Verdict of the safety screen for a single input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SafetyVerdict {
    pub fn allow() -> Self {
        Self {
            is_blocked: false,
            reason: None,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            is_blocked: true,
            reason: Some(reason.into()),
        }
    }
}

/// Result of submitting one user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The model produced an answer; it was appended to history
    Answered { message: String },
    /// The safety screen rejected the input; history is untouched
    Blocked {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// The turn failed after the user message was recorded; `message` was
    /// appended to history as the assistant turn
    Failed { kind: ErrorKind, message: String },
    /// The input was empty; nothing was screened or recorded
    EmptyInput,
}

impl TurnOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered { .. })
    }

    /// Assistant text that was recorded for this turn, if any
    pub fn assistant_message(&self) -> Option<&str> {
        match self {
            TurnOutcome::Answered { message } | TurnOutcome::Failed { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }
}

//! REST API handlers for the chat front-end
//!
//! Provides the chat, clear, history and session teardown endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::chat::domain::{ChatMessage, ChatPort, TurnOutcome};
use crate::chat::error::ChatError;

/// Shared application state for chat handlers
#[derive(Clone)]
pub struct ChatApiState {
    pub chat: Arc<dyn ChatPort>,
}

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Omit to start a new session
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub session_id: String,
    /// Text to show the user, whatever the outcome
    pub reply: String,
    #[serde(flatten)]
    pub outcome: TurnOutcome,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
}

fn reply_text(outcome: &TurnOutcome) -> String {
    match outcome {
        TurnOutcome::Answered { message } | TurnOutcome::Failed { message, .. } => message.clone(),
        TurnOutcome::Blocked { reason } => ChatError::BlockedByPolicy(reason.clone()).user_message(),
        TurnOutcome::EmptyInput => ChatError::EmptyInput.user_message(),
    }
}

/// POST /api/chat - Submit a message, creating a session when none is given
pub async fn chat(
    State(state): State<ChatApiState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<ChatReply>::error("Message must not be empty")),
        );
    }

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match state.chat.submit_turn(&session_id, &request.message).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(ChatReply {
                session_id,
                reply: reply_text(&outcome),
                outcome,
            })),
        ),
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Failed to process message: {}", e))),
            )
        }
    }
}

/// POST /api/clear - Empty a session's history
pub async fn clear(
    State(state): State<ChatApiState>,
    Json(request): Json<SessionRequest>,
) -> impl IntoResponse {
    match state.chat.clear_history(&request.session_id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok())),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(format!("Failed to clear history: {}", e))),
        ),
    }
}

/// GET /api/history?session_id= - Ordered history of a session
pub async fn history(
    State(state): State<ChatApiState>,
    Query(query): Query<SessionRequest>,
) -> impl IntoResponse {
    match state.chat.get_history(&query.session_id).await {
        Ok(messages) => (
            StatusCode::OK,
            Json(ApiResponse::success(HistoryResponse {
                session_id: query.session_id,
                messages,
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to load history: {}", e))),
        ),
    }
}

/// DELETE /api/sessions/:session_id - Tear a session down
pub async fn delete_session(
    State(state): State<ChatApiState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.chat.delete_session(&session_id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok())),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(format!("Failed to delete session: {}", e))),
        ),
    }
}

//! # Graphchat - conversational access to a knowledge graph
//!
//! Graphchat forwards user questions to a language model that can look up the
//! ontology of a SPARQL store and query it, then returns a formatted answer
//! grounded in the retrieved data.
//!
//! ## Features
//!
//! - **Safety screen**: every input is classified before any work is done
//! - **Tool calling**: `get_ontology` and `query_graph_database` over SPARQL 1.1
//! - **Providers**: OpenAI-compatible endpoints and Azure OpenAI deployments
//! - **Sessions**: in-memory histories with per-session serialization and expiry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clap::Parser;
//! use graphchat::{chat::ChatHandler, cli::Cli, config::Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new_with_cli(&Cli::parse())?;
//!     let chat = ChatHandler::from_settings(&settings)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Chat**: domain types, orchestration, providers and tools
//! - **Adapters**: HTTP handlers
//! - **Config**: configuration loading and validation

pub mod adapters;
pub mod chat;
pub mod cli;
pub mod config;

use crate::adapters::chat_handler::{self, ChatApiState};
use crate::adapters::health_handler::HealthHandler;
use crate::chat::domain::ChatPort;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `chat` - Conversation port serving the chat endpoints
/// * `health_handler` - Health check handler
///
/// # Returns
///
/// Configured Axum Router
pub fn create_app(chat: Arc<dyn ChatPort>, health_handler: Arc<HealthHandler>) -> Router {
    let health_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }));

    let api_router = Router::new()
        .route("/chat", post(chat_handler::chat))
        .route("/clear", post(chat_handler::clear))
        .route("/history", get(chat_handler::history))
        .route("/sessions/:session_id", delete(chat_handler::delete_session))
        .with_state(ChatApiState { chat });

    let router = health_router.nest("/api", api_router);

    router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}

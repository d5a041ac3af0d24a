use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::chat::tools::SparqlEndpoint;

const READY_PROBE: &str = "ASK { ?s ?p ?o }";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

pub struct HealthHandler {
    graph_store: Option<Arc<dyn SparqlEndpoint>>,
    probe_timeout: Duration,
    start_time: std::time::Instant,
}

impl HealthHandler {
    /// `graph_store` is probed by the readiness check when given
    pub fn new(graph_store: Option<Arc<dyn SparqlEndpoint>>) -> Self {
        Self {
            graph_store,
            probe_timeout: Duration::from_secs(5),
            start_time: std::time::Instant::now(),
        }
    }

    /// Basic health check - returns 200 if server is running
    pub async fn health(&self) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        };

        (StatusCode::OK, Json(status))
    }

    /// Readiness check - returns 200 if the graph store answers a trivial query
    pub async fn ready(&self) -> impl IntoResponse {
        let Some(store) = &self.graph_store else {
            return (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ready",
                    "message": "No graph store probe configured"
                })),
            );
        };

        match tokio::time::timeout(self.probe_timeout, store.query(READY_PROBE)).await {
            Ok(Ok(_)) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ready",
                    "message": "Graph store is reachable"
                })),
            ),
            Ok(Err(e)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "message": e.to_string()
                })),
            ),
            Err(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "message": "Graph store probe timed out"
                })),
            ),
        }
    }

    /// Liveness check - returns 200 if server is alive
    pub async fn live(&self) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "alive",
                "message": "Server is alive"
            })),
        )
    }
}

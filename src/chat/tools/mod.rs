//! Graph query tools offered to the model
//!
//! The model may call exactly two tools: one that returns the ontology the
//! store is built on and one that runs a SPARQL query. Tool names are mapped
//! onto the closed [`GraphTool`] enumeration before anything executes.

mod ontology;
mod sparql;

pub use ontology::OntologyProvider;
pub use sparql::{GraphDbClient, QueryResult, SparqlEndpoint};

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chat::domain::{tool_payload, ToolCall, ToolCallResult, ToolDefinition};
use crate::chat::error::{ChatError, ChatResult, QueryError};

/// Tools known to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphTool {
    GetOntology,
    QueryGraphDatabase,
}

impl GraphTool {
    pub const ALL: [GraphTool; 2] = [GraphTool::GetOntology, GraphTool::QueryGraphDatabase];

    pub fn name(&self) -> &'static str {
        match self {
            GraphTool::GetOntology => "get_ontology",
            GraphTool::QueryGraphDatabase => "query_graph_database",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            GraphTool::GetOntology => ToolDefinition::new(
                self.name(),
                "Returns the ontology (classes and properties) of the knowledge graph. \
                 Call this before writing a SPARQL query.",
                json!({
                    "type": "object",
                    "properties": {},
                    "required": [],
                    "additionalProperties": false
                }),
            ),
            GraphTool::QueryGraphDatabase => ToolDefinition::new(
                self.name(),
                "Runs a SPARQL SELECT or ASK query against the knowledge graph and returns \
                 the result rows.",
                json!({
                    "type": "object",
                    "properties": {
                        "sparql_query": {
                            "type": "string",
                            "description": "A valid SPARQL query using only classes and properties from the ontology"
                        }
                    },
                    "required": ["sparql_query"],
                    "additionalProperties": false
                }),
            ),
        }
    }
}

/// A tool call whose arguments have been validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphToolCall {
    GetOntology,
    Query { sparql: String },
}

impl GraphToolCall {
    /// Map a model tool call onto a known tool with typed arguments
    pub fn parse(call: &ToolCall) -> ChatResult<Self> {
        let tool = GraphTool::from_name(&call.name)
            .ok_or_else(|| ChatError::UnknownTool(call.name.clone()))?;

        let args = call.arguments.as_object().ok_or_else(|| {
            ChatError::MalformedToolCall(format!(
                "arguments for {} are not a JSON object: {}",
                call.name,
                call.raw_arguments()
            ))
        })?;

        match tool {
            GraphTool::GetOntology => Ok(GraphToolCall::GetOntology),
            GraphTool::QueryGraphDatabase => match args.get("sparql_query") {
                Some(Value::String(sparql)) => Ok(GraphToolCall::Query {
                    sparql: sparql.clone(),
                }),
                _ => Err(ChatError::MalformedToolCall(format!(
                    "{} requires a string sparql_query argument",
                    call.name
                ))),
            },
        }
    }
}

/// Executes graph tools against a SPARQL endpoint
pub struct GraphQueryTools {
    endpoint: Arc<dyn SparqlEndpoint>,
    ontology: OntologyProvider,
    max_rows: usize,
    timeout: Duration,
}

impl GraphQueryTools {
    pub fn new(
        endpoint: Arc<dyn SparqlEndpoint>,
        ontology: OntologyProvider,
        max_rows: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            ontology,
            max_rows,
            timeout,
        }
    }

    /// Definitions offered to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        GraphTool::ALL.iter().map(GraphTool::definition).collect()
    }

    /// Ontology description
    pub async fn get_ontology(&self) -> Result<String, QueryError> {
        self.ontology.describe().await
    }

    /// Run a query and cap the rows handed back
    pub async fn execute_query(&self, sparql: &str) -> Result<QueryResult, QueryError> {
        let mut result = self.endpoint.query(sparql).await?;
        result.truncate(self.max_rows);
        Ok(result)
    }

    /// Execute one model tool call.
    ///
    /// Unknown tools and unusable arguments end the turn. Store failures are
    /// returned as a structured error payload so the model can correct itself.
    pub async fn execute(&self, call: &ToolCall) -> ChatResult<ToolCallResult> {
        let parsed = GraphToolCall::parse(call)?;
        let start = Instant::now();

        let outcome = tokio::time::timeout(self.timeout, async {
            match &parsed {
                GraphToolCall::GetOntology => self
                    .get_ontology()
                    .await
                    .map(|text| json!({ "ontology": text })),
                GraphToolCall::Query { sparql } => self
                    .execute_query(sparql)
                    .await
                    .and_then(|result| {
                        serde_json::to_value(result).map_err(|e| QueryError::Parse(e.to_string()))
                    }),
            }
        })
        .await
        .unwrap_or_else(|_| Err(QueryError::Timeout(self.timeout.as_secs())));

        let execution_time_ms = start.elapsed().as_millis() as u64;

        let (payload, success) = match outcome {
            Ok(value) => (value, true),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Graph tool failed");
                (
                    json!({ "error": { "kind": e.kind(), "message": e.to_string() } }),
                    false,
                )
            }
        };

        Ok(ToolCallResult {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            content: tool_payload(&payload),
            execution_time_ms,
            success,
        })
    }
}

//! SPARQL protocol client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::chat::config::GraphStoreConfig;
use crate::chat::error::{QueryError, StoreResult};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Trait for SPARQL endpoints
#[async_trait]
pub trait SparqlEndpoint: Send + Sync {
    /// Evaluate a SELECT or ASK query
    async fn query(&self, sparql: &str) -> StoreResult<QueryResult>;
}

/// Tabular result of a SPARQL query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Projected variable names, in order
    pub variables: Vec<String>,
    /// One mapping per solution; unbound variables are absent
    pub rows: Vec<BTreeMap<String, String>>,
    /// Answer of an ASK query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean: Option<bool>,
    /// Set when rows were dropped to respect the row cap
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl QueryResult {
    /// Keep at most `max_rows` rows
    pub fn truncate(&mut self, max_rows: usize) {
        if self.rows.len() > max_rows {
            self.rows.truncate(max_rows);
            self.truncated = true;
        }
    }

    /// Parse a `application/sparql-results+json` document
    pub fn from_json(body: &str) -> StoreResult<Self> {
        let document: SparqlResults =
            serde_json::from_str(body).map_err(|e| QueryError::Parse(e.to_string()))?;

        if let Some(boolean) = document.boolean {
            return Ok(Self {
                boolean: Some(boolean),
                ..Default::default()
            });
        }

        let results = document
            .results
            .ok_or_else(|| QueryError::Parse("missing results and boolean".to_string()))?;

        let rows = results
            .bindings
            .into_iter()
            .map(|binding| {
                binding
                    .into_iter()
                    .map(|(var, term)| (var, term.value))
                    .collect()
            })
            .collect();

        Ok(Self {
            variables: document.head.vars,
            rows,
            boolean: None,
            truncated: false,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    head: SparqlHead,
    results: Option<SparqlBindings>,
    boolean: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SparqlHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    value: String,
}

/// Client for a SPARQL 1.1 protocol endpoint such as a GraphDB repository
pub struct GraphDbClient {
    client: reqwest::Client,
    endpoint: String,
    timeout_seconds: u64,
}

impl GraphDbClient {
    pub fn new(config: &GraphStoreConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SparqlEndpoint for GraphDbClient {
    async fn query(&self, sparql: &str) -> StoreResult<QueryResult> {
        if sparql.trim().is_empty() {
            return Err(QueryError::Malformed("query is empty".to_string()));
        }

        tracing::debug!(endpoint = %self.endpoint, "Executing SPARQL query");

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", sparql)])
            .send()
            .await
            .map_err(|e| match QueryError::from(e) {
                QueryError::Timeout(_) => QueryError::Timeout(self.timeout_seconds),
                other => other,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Unreachable(e.to_string()))?;

        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(QueryError::Malformed(body));
        }
        if !status.is_success() {
            return Err(QueryError::Store {
                status: status.as_u16(),
                message: body,
            });
        }

        QueryResult::from_json(&body)
    }
}

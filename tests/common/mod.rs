#![allow(dead_code)]

use async_trait::async_trait;
use graphchat::chat::config::{ChatConfig, OntologyConfig};
use graphchat::chat::core::Orchestrator;
use graphchat::chat::domain::{Message, Role, SafetyVerdict, ToolCall};
use graphchat::chat::error::{LlmResult, QueryError, StoreResult};
use graphchat::chat::guardrail::SafetyScreen;
use graphchat::chat::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use graphchat::chat::memory::InMemorySessionStore;
use graphchat::chat::tools::{GraphQueryTools, OntologyProvider, QueryResult, SparqlEndpoint};
use graphchat::chat::ChatHandler;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const JAGUAR_ONTOLOGY: &str = r#"@prefix : <http://example.org/jaguar#> .
:Population a owl:Class ; rdfs:label "Population" .
:region a owl:DatatypeProperty ; rdfs:domain :Population .
:count a owl:DatatypeProperty ; rdfs:domain :Population ."#;

pub const POPULATION_QUERY: &str = "PREFIX : <http://example.org/jaguar#>\nSELECT ?region ?count WHERE { ?p a :Population ; :region ?region ; :count ?count }";

type Responder = dyn Fn(&CompletionRequest) -> LlmResult<Message> + Send + Sync;

/// Language model whose replies are computed from the transcript it receives
pub struct ScriptedLlm {
    respond: Box<Responder>,
    delay: Duration,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(
        respond: impl Fn(&CompletionRequest) -> LlmResult<Message> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::with_delay(Duration::ZERO, respond)
    }

    pub fn with_delay(
        delay: Duration,
        respond: impl Fn(&CompletionRequest) -> LlmResult<Message> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            delay,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let reply = (self.respond)(&request);
        self.requests.lock().unwrap().push(request);
        tokio::time::sleep(self.delay).await;

        let message = reply?;
        let finish_reason = if message.requested_tools().is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        };
        Ok(CompletionResponse {
            message,
            finish_reason,
            usage: None,
        })
    }
}

/// Last tool result in the transcript, if the model already called a tool
pub fn last_tool_result(request: &CompletionRequest) -> Option<&str> {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Tool)
        .map(|m| m.content.as_str())
}

/// Model that queries the population once and then summarizes the tool output
pub fn jaguar_analyst() -> Arc<ScriptedLlm> {
    ScriptedLlm::new(|request| match last_tool_result(request) {
        None => Ok(Message::assistant_with_tools(
            "",
            vec![ToolCall::new(
                "call_population",
                "query_graph_database",
                json!({ "sparql_query": POPULATION_QUERY }),
            )],
        )),
        Some(result) if result.contains("\"error\"") => Ok(Message::assistant(
            "I could not retrieve the data because the database is unreachable. Please try again later.",
        )),
        Some(result) => {
            let rows: serde_json::Value = serde_json::from_str(result).unwrap_or_default();
            let count = rows["rows"].as_array().map_or(0, |r| r.len());
            Ok(Message::assistant(format!(
                "According to the database, jaguar populations are recorded in {} regions. The Pantanal holds the largest one.\n\n```sparql\n{}\n```",
                count, POPULATION_QUERY
            )))
        }
    })
}

/// Safety screen with a fixed verdict that counts its invocations
pub struct FixedScreen {
    verdict: SafetyVerdict,
    calls: AtomicUsize,
}

impl FixedScreen {
    pub fn allow() -> Arc<Self> {
        Arc::new(Self {
            verdict: SafetyVerdict::allow(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn block(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            verdict: SafetyVerdict::block(reason),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SafetyScreen for FixedScreen {
    async fn screen(&self, _input: &str) -> SafetyVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict.clone()
    }
}

/// Graph store stand-in recording the queries it receives
pub struct FakeGraphStore {
    response: StoreResult<QueryResult>,
    queries: Mutex<Vec<String>>,
}

impl FakeGraphStore {
    pub fn populations() -> Arc<Self> {
        let row = |region: &str, count: &str| {
            BTreeMap::from([
                ("region".to_string(), region.to_string()),
                ("count".to_string(), count.to_string()),
            ])
        };
        Arc::new(Self {
            response: Ok(QueryResult {
                variables: vec!["region".to_string(), "count".to_string()],
                rows: vec![row("Pantanal", "4000"), row("Amazon", "3500")],
                ..Default::default()
            }),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            response: Err(QueryError::Unreachable("connection refused".to_string())),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SparqlEndpoint for FakeGraphStore {
    async fn query(&self, sparql: &str) -> StoreResult<QueryResult> {
        self.queries.lock().unwrap().push(sparql.to_string());
        self.response.clone()
    }
}

/// Build a chat handler over in-process fakes
pub fn chat_handler(
    llm: Arc<dyn LlmProvider>,
    screen: Arc<dyn SafetyScreen>,
    store: Arc<dyn SparqlEndpoint>,
    config: ChatConfig,
) -> ChatHandler {
    let ontology = OntologyProvider::new(
        OntologyConfig::Inline {
            text: JAGUAR_ONTOLOGY.to_string(),
        },
        store.clone(),
    );
    let tools = Arc::new(GraphQueryTools::new(
        store.clone(),
        ontology,
        100,
        Duration::from_secs(5),
    ));
    let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(
        config.session_ttl_seconds,
    )));
    let orchestrator = Orchestrator::new(llm, screen, tools, config);
    ChatHandler::new(sessions, orchestrator, store)
}

//! Conversation turn state machine

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OwnedMutexGuard;

use super::{format_response, render_system_prompt};
use crate::chat::config::ChatConfig;
use crate::chat::domain::{ConversationHistory, Message, Role, TurnOutcome};
use crate::chat::error::ChatError;
use crate::chat::guardrail::SafetyScreen;
use crate::chat::llm::{CompletionRequest, LlmProvider, ToolChoice};
use crate::chat::memory::{apply_strategy, SessionStore};
use crate::chat::tools::GraphQueryTools;

/// States of a single conversation turn
#[derive(Debug)]
pub enum TurnState {
    /// Input received, nothing checked yet
    Start,
    /// The safety screen allowed the input
    Screened,
    /// Waiting on the model; `round` counts completed tool rounds
    CallModel { round: u32 },
    /// The model replied
    ModelCalled { reply: Message, round: u32 },
    /// Executing the tools the model asked for
    ToolDispatch { reply: Message, round: u32 },
    /// Final answer ready to be recorded
    Formatted { answer: String },
    /// The turn stopped early
    Aborted(ChatError),
    /// Terminal state
    Done(TurnOutcome),
}

impl TurnState {
    fn label(&self) -> &'static str {
        match self {
            TurnState::Start => "start",
            TurnState::Screened => "screened",
            TurnState::CallModel { .. } => "call_model",
            TurnState::ModelCalled { .. } => "model_called",
            TurnState::ToolDispatch { .. } => "tool_dispatch",
            TurnState::Formatted { .. } => "formatted",
            TurnState::Aborted(_) => "aborted",
            TurnState::Done(_) => "done",
        }
    }
}

/// Per-turn working data
struct Turn<'a> {
    session_id: &'a str,
    input: &'a str,
    /// Held from `Screened` until the turn ends, serializing turns per session
    history: Option<OwnedMutexGuard<ConversationHistory>>,
    transcript: Vec<Message>,
    tool_calls: usize,
}

/// Drives the model through tool-call rounds to a final answer
pub struct Orchestrator {
    llm: Arc<dyn LlmProvider>,
    screen: Arc<dyn SafetyScreen>,
    tools: Arc<GraphQueryTools>,
    config: ChatConfig,
    system_prompt: String,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        screen: Arc<dyn SafetyScreen>,
        tools: Arc<GraphQueryTools>,
        config: ChatConfig,
    ) -> Self {
        let system_prompt = render_system_prompt(config.system_prompt.as_deref(), &config.domain);
        Self {
            llm,
            screen,
            tools,
            config,
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Run one turn for a session.
    ///
    /// The session is only created and locked once the input has passed the
    /// safety screen, so rejected and empty inputs leave the store untouched.
    pub async fn run_turn(
        &self,
        store: &dyn SessionStore,
        session_id: &str,
        input: &str,
    ) -> TurnOutcome {
        let start = Instant::now();
        let mut turn = Turn {
            session_id,
            input,
            history: None,
            transcript: Vec::new(),
            tool_calls: 0,
        };

        let mut state = TurnState::Start;
        let outcome = loop {
            tracing::trace!(session_id, state = state.label(), "Turn state");
            state = match state {
                TurnState::Done(outcome) => break outcome,
                other => self.step(other, &mut turn, store).await,
            };
        };

        let status = match &outcome {
            TurnOutcome::Answered { .. } => "answered",
            TurnOutcome::Blocked { .. } => "blocked",
            TurnOutcome::Failed { .. } => "failed",
            TurnOutcome::EmptyInput => "empty_input",
        };
        tracing::info!(
            session_id,
            status,
            tool_calls = turn.tool_calls,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Turn completed"
        );

        outcome
    }

    async fn step(&self, state: TurnState, turn: &mut Turn<'_>, store: &dyn SessionStore) -> TurnState {
        match state {
            TurnState::Start => {
                if turn.input.trim().is_empty() {
                    return TurnState::Aborted(ChatError::EmptyInput);
                }
                let verdict = self.screen.screen(turn.input).await;
                if verdict.is_blocked {
                    TurnState::Aborted(ChatError::BlockedByPolicy(verdict.reason))
                } else {
                    TurnState::Screened
                }
            }

            TurnState::Screened => {
                let shared = store.get_or_create(turn.session_id).await;
                let mut history = shared.lock_owned().await;
                history.add_message(Role::User, turn.input);

                turn.transcript = Vec::with_capacity(history.len() + 1);
                turn.transcript.push(Message::system(&self.system_prompt));
                turn.transcript
                    .extend(apply_strategy(history.messages(), &self.config.memory));
                turn.history = Some(history);

                TurnState::CallModel { round: 0 }
            }

            TurnState::CallModel { round } => {
                let tool_choice = if round < self.config.max_tool_rounds {
                    ToolChoice::Auto
                } else {
                    ToolChoice::None
                };
                let request = CompletionRequest {
                    messages: turn.transcript.clone(),
                    tools: Some(self.tools.definitions()),
                    tool_choice: Some(tool_choice),
                    ..Default::default()
                };

                let timeout = Duration::from_secs(self.config.model_timeout_seconds);
                match tokio::time::timeout(timeout, self.llm.complete(request)).await {
                    Ok(Ok(response)) => TurnState::ModelCalled {
                        reply: response.message,
                        round,
                    },
                    Ok(Err(e)) => TurnState::Aborted(e.into()),
                    Err(_) => TurnState::Aborted(ChatError::UpstreamUnavailable(format!(
                        "model call timed out after {}s",
                        timeout.as_secs()
                    ))),
                }
            }

            TurnState::ModelCalled { reply, round } => {
                if reply.requested_tools().is_empty() {
                    let answer = format_response(&reply.content);
                    if answer.is_empty() {
                        return TurnState::Aborted(ChatError::UpstreamUnavailable(
                            "model returned an empty answer".to_string(),
                        ));
                    }
                    TurnState::Formatted { answer }
                } else if round >= self.config.max_tool_rounds {
                    TurnState::Aborted(ChatError::ToolRoundLimitExceeded(
                        self.config.max_tool_rounds,
                    ))
                } else {
                    TurnState::ToolDispatch { reply, round }
                }
            }

            TurnState::ToolDispatch { reply, round } => {
                let calls = reply.requested_tools().to_vec();
                turn.transcript
                    .push(Message::assistant_with_tools(reply.content, calls.clone()));

                for call in &calls {
                    tracing::debug!(
                        session_id = turn.session_id,
                        tool = %call.name,
                        round,
                        "Dispatching tool call"
                    );
                    match self.tools.execute(call).await {
                        Ok(result) => {
                            turn.tool_calls += 1;
                            turn.transcript
                                .push(Message::tool_result(result.tool_call_id, result.content));
                        }
                        Err(e) => return TurnState::Aborted(e),
                    }
                }

                TurnState::CallModel { round: round + 1 }
            }

            TurnState::Formatted { answer } => {
                if let Some(history) = turn.history.as_mut() {
                    history.add_message(Role::Assistant, answer.clone());
                }
                TurnState::Done(TurnOutcome::Answered { message: answer })
            }

            TurnState::Aborted(error) => self.abort(error, turn),

            done @ TurnState::Done(_) => done,
        }
    }

    /// Map an early stop to its outcome, pairing the recorded user message
    /// with an assistant error entry
    fn abort(&self, error: ChatError, turn: &mut Turn<'_>) -> TurnState {
        let Some(history) = turn.history.as_mut() else {
            return TurnState::Done(match error {
                ChatError::EmptyInput => TurnOutcome::EmptyInput,
                ChatError::BlockedByPolicy(reason) => TurnOutcome::Blocked { reason },
                other => TurnOutcome::Failed {
                    kind: other.kind(),
                    message: other.user_message(),
                },
            });
        };

        tracing::warn!(session_id = turn.session_id, error = %error, "Turn failed");
        let message = error.user_message();
        history.add_message(Role::Assistant, message.clone());
        TurnState::Done(TurnOutcome::Failed {
            kind: error.kind(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::config::{MemoryStrategy, OntologyConfig};
    use crate::chat::domain::{SafetyVerdict, ToolCall};
    use crate::chat::error::{ErrorKind, LlmError, LlmResult, StoreResult};
    use crate::chat::llm::{CompletionResponse, FinishReason};
    use crate::chat::memory::InMemorySessionStore;
    use crate::chat::tools::{OntologyProvider, QueryResult, SparqlEndpoint};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    struct ScriptedLlm {
        replies: Mutex<VecDeque<LlmResult<Message>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<LlmResult<Message>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::InvalidRequest("script exhausted".to_string())))?;
            let finish_reason = if reply.requested_tools().is_empty() {
                FinishReason::Stop
            } else {
                FinishReason::ToolCalls
            };
            Ok(CompletionResponse {
                message: reply,
                finish_reason,
                usage: None,
            })
        }
    }

    struct FixedScreen(SafetyVerdict);

    #[async_trait]
    impl SafetyScreen for FixedScreen {
        async fn screen(&self, _input: &str) -> SafetyVerdict {
            self.0.clone()
        }
    }

    struct PopulationStore;

    #[async_trait]
    impl SparqlEndpoint for PopulationStore {
        async fn query(&self, _sparql: &str) -> StoreResult<QueryResult> {
            Ok(QueryResult {
                variables: vec!["count".to_string()],
                rows: vec![BTreeMap::from([("count".to_string(), "42".to_string())])],
                ..Default::default()
            })
        }
    }

    fn orchestrator(llm: Arc<ScriptedLlm>, verdict: SafetyVerdict, max_tool_rounds: u32) -> Orchestrator {
        let endpoint: Arc<dyn SparqlEndpoint> = Arc::new(PopulationStore);
        let ontology = OntologyProvider::new(
            OntologyConfig::Inline {
                text: ":Population a owl:Class .".to_string(),
            },
            endpoint.clone(),
        );
        let tools = Arc::new(GraphQueryTools::new(
            endpoint,
            ontology,
            50,
            Duration::from_secs(5),
        ));
        Orchestrator::new(
            llm,
            Arc::new(FixedScreen(verdict)),
            tools,
            ChatConfig {
                max_tool_rounds,
                ..Default::default()
            },
        )
    }

    fn query_request(id: &str) -> Message {
        Message::assistant_with_tools(
            "",
            vec![ToolCall::new(
                id,
                "query_graph_database",
                json!({"sparql_query": "SELECT ?count WHERE { ?p a :Population ; :count ?count }"}),
            )],
        )
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let llm = ScriptedLlm::new(vec![
            Ok(query_request("call_1")),
            Ok(Message::assistant("The database lists 42 jaguars. That is all.")),
        ]);
        let orchestrator = orchestrator(llm.clone(), SafetyVerdict::allow(), 2);
        let store = InMemorySessionStore::new(Duration::from_secs(60));

        let outcome = orchestrator.run_turn(&store, "s1", "How many jaguars?").await;
        assert_eq!(
            outcome,
            TurnOutcome::Answered {
                message: "The database lists 42 jaguars.\n\nThat is all.".to_string()
            }
        );

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tool_choice, Some(ToolChoice::Auto));
        assert_eq!(requests[0].messages[0].role, Role::System);
        let second = &requests[1].messages;
        assert_eq!(second[second.len() - 2].requested_tools().len(), 1);
        assert_eq!(second[second.len() - 1].role, Role::Tool);
        assert!(second[second.len() - 1].content.contains("42"));

        let history = store.get("s1").await.unwrap();
        let history = history.lock().await;
        assert_eq!(history.len(), 2);
        assert!(history.messages().iter().all(|m| m.role != Role::Tool));
    }

    #[tokio::test]
    async fn test_single_round_forces_answer() {
        let llm = ScriptedLlm::new(vec![
            Ok(query_request("call_1")),
            Ok(Message::assistant("42 jaguars.")),
        ]);
        let orchestrator = orchestrator(llm.clone(), SafetyVerdict::allow(), 1);
        let store = InMemorySessionStore::new(Duration::from_secs(60));

        let outcome = orchestrator.run_turn(&store, "s1", "How many jaguars?").await;
        assert!(outcome.is_answered());

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].tool_choice, Some(ToolChoice::None));
    }

    #[tokio::test]
    async fn test_round_limit_exceeded() {
        let llm = ScriptedLlm::new(vec![Ok(query_request("call_1")), Ok(query_request("call_2"))]);
        let orchestrator = orchestrator(llm, SafetyVerdict::allow(), 1);
        let store = InMemorySessionStore::new(Duration::from_secs(60));

        let outcome = orchestrator.run_turn(&store, "s1", "How many jaguars?").await;
        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                kind: ErrorKind::ToolRoundLimitExceeded,
                ..
            }
        ));

        let history = store.get("s1").await.unwrap();
        let history = history.lock().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_blocked_input_skips_model_and_session() {
        let llm = ScriptedLlm::new(vec![]);
        let orchestrator = orchestrator(llm.clone(), SafetyVerdict::block("off topic"), 2);
        let store = InMemorySessionStore::new(Duration::from_secs(60));

        let outcome = orchestrator.run_turn(&store, "s1", "Tell me a joke").await;
        assert_eq!(
            outcome,
            TurnOutcome::Blocked {
                reason: Some("off topic".to_string())
            }
        );
        assert!(llm.requests().is_empty());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let llm = ScriptedLlm::new(vec![]);
        let orchestrator = orchestrator(llm.clone(), SafetyVerdict::block("never screened"), 2);
        let store = InMemorySessionStore::new(Duration::from_secs(60));

        assert_eq!(
            orchestrator.run_turn(&store, "s1", "  \n").await,
            TurnOutcome::EmptyInput
        );
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_turn() {
        let llm = ScriptedLlm::new(vec![Ok(Message::assistant_with_tools(
            "",
            vec![ToolCall::new("call_1", "drop_graph", json!({}))],
        ))]);
        let orchestrator = orchestrator(llm, SafetyVerdict::allow(), 2);
        let store = InMemorySessionStore::new(Duration::from_secs(60));

        let outcome = orchestrator.run_turn(&store, "s1", "How many jaguars?").await;
        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                kind: ErrorKind::UnknownTool,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_model_error_is_recorded() {
        let llm = ScriptedLlm::new(vec![Err(LlmError::RateLimited)]);
        let orchestrator = orchestrator(llm, SafetyVerdict::allow(), 2);
        let store = InMemorySessionStore::new(Duration::from_secs(60));

        let outcome = orchestrator.run_turn(&store, "s1", "How many jaguars?").await;
        let TurnOutcome::Failed { kind, message } = outcome else {
            panic!("expected a failed turn");
        };
        assert_eq!(kind, ErrorKind::UpstreamUnavailable);

        let history = store.get("s1").await.unwrap();
        let history = history.lock().await;
        assert_eq!(history.messages()[1].content, message);
    }

    #[tokio::test]
    async fn test_sliding_window_limits_transcript() {
        let llm = ScriptedLlm::new(vec![
            Ok(Message::assistant("First.")),
            Ok(Message::assistant("Second.")),
        ]);
        let endpoint: Arc<dyn SparqlEndpoint> = Arc::new(PopulationStore);
        let ontology = OntologyProvider::new(
            OntologyConfig::Inline {
                text: String::new(),
            },
            endpoint.clone(),
        );
        let orchestrator = Orchestrator::new(
            llm.clone(),
            Arc::new(FixedScreen(SafetyVerdict::allow())),
            Arc::new(GraphQueryTools::new(endpoint, ontology, 10, Duration::from_secs(1))),
            ChatConfig {
                memory: MemoryStrategy::SlidingWindow { size: 1 },
                ..Default::default()
            },
        );
        let store = InMemorySessionStore::new(Duration::from_secs(60));

        orchestrator.run_turn(&store, "s1", "jaguar one").await;
        orchestrator.run_turn(&store, "s1", "jaguar two").await;

        let requests = llm.requests();
        // system prompt + the newest user message
        assert_eq!(requests[1].messages.len(), 2);
        assert_eq!(requests[1].messages[1].content, "jaguar two");
    }
}

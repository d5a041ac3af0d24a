//! Chat handler implementing ChatPort

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::chat::core::Orchestrator;
use crate::chat::domain::{ChatMessage, ChatPort, TurnOutcome};
use crate::chat::guardrail::{LlmSafetyScreen, SafetyScreen};
use crate::chat::llm::{create_provider, LlmProvider};
use crate::chat::memory::{InMemorySessionStore, SessionStore};
use crate::chat::tools::{GraphDbClient, GraphQueryTools, OntologyProvider, SparqlEndpoint};
use crate::config::Settings;

/// Handler for conversation operations
pub struct ChatHandler {
    store: Arc<dyn SessionStore>,
    orchestrator: Orchestrator,
    endpoint: Arc<dyn SparqlEndpoint>,
}

impl ChatHandler {
    /// Create a handler from already constructed parts
    pub fn new(
        store: Arc<dyn SessionStore>,
        orchestrator: Orchestrator,
        endpoint: Arc<dyn SparqlEndpoint>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            endpoint,
        }
    }

    /// Wire providers, graph store client and session store from configuration
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let llm = create_provider(&settings.llm)?;
        tracing::info!(provider = llm.name(), model = llm.model(), "Chat model configured");

        let screen_llm: Arc<dyn LlmProvider> = match &settings.guardrail.llm {
            Some(config) => create_provider(config)?,
            None => llm.clone(),
        };
        let screen: Arc<dyn SafetyScreen> = Arc::new(LlmSafetyScreen::new(
            screen_llm,
            &settings.chat.domain,
            settings.guardrail.max_input_chars,
            Duration::from_secs(settings.guardrail.timeout_seconds),
        ));

        let client = GraphDbClient::new(&settings.graph_store)?;
        tracing::info!(endpoint = client.endpoint(), "Graph store configured");
        let endpoint: Arc<dyn SparqlEndpoint> = Arc::new(client);

        let ontology = OntologyProvider::new(settings.ontology.clone(), endpoint.clone());
        let tools = Arc::new(GraphQueryTools::new(
            endpoint.clone(),
            ontology,
            settings.graph_store.max_rows,
            Duration::from_secs(settings.chat.tool_timeout_seconds),
        ));

        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(
            Duration::from_secs(settings.chat.session_ttl_seconds),
        ));

        let orchestrator = Orchestrator::new(llm, screen, tools, settings.chat.clone());
        Ok(Self::new(store, orchestrator, endpoint))
    }

    /// SPARQL endpoint used by the graph tools
    pub fn graph_endpoint(&self) -> Arc<dyn SparqlEndpoint> {
        self.endpoint.clone()
    }
}

#[async_trait]
impl ChatPort for ChatHandler {
    async fn submit_turn(&self, session_id: &str, message: &str) -> anyhow::Result<TurnOutcome> {
        Ok(self
            .orchestrator
            .run_turn(self.store.as_ref(), session_id, message)
            .await)
    }

    async fn clear_history(&self, session_id: &str) -> anyhow::Result<()> {
        if let Some(history) = self.store.get(session_id).await {
            history.lock().await.clear();
            tracing::debug!(session_id, "Cleared history");
        }
        Ok(())
    }

    async fn get_history(&self, session_id: &str) -> anyhow::Result<Vec<ChatMessage>> {
        match self.store.get(session_id).await {
            Some(history) => Ok(history.lock().await.messages().to_vec()),
            None => Ok(Vec::new()),
        }
    }

    async fn delete_session(&self, session_id: &str) -> anyhow::Result<()> {
        if self.store.remove(session_id).await {
            tracing::debug!(session_id, "Deleted session");
        }
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<usize> {
        Ok(self.store.purge_expired().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::config::{ChatConfig, OntologyConfig};
    use crate::chat::domain::{Message, Role, SafetyVerdict};
    use crate::chat::error::{LlmResult, StoreResult};
    use crate::chat::llm::{CompletionRequest, CompletionResponse, FinishReason};
    use crate::chat::tools::QueryResult;

    struct EchoLlm;

    #[async_trait]
    impl LlmProvider for EchoLlm {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(CompletionResponse {
                message: Message::assistant(format!("You asked: {}", last)),
                finish_reason: FinishReason::Stop,
                usage: None,
            })
        }
    }

    struct AllowAll;

    #[async_trait]
    impl SafetyScreen for AllowAll {
        async fn screen(&self, _input: &str) -> SafetyVerdict {
            SafetyVerdict::allow()
        }
    }

    struct EmptyStore;

    #[async_trait]
    impl SparqlEndpoint for EmptyStore {
        async fn query(&self, _sparql: &str) -> StoreResult<QueryResult> {
            Ok(QueryResult::default())
        }
    }

    fn handler(ttl: Duration) -> ChatHandler {
        let endpoint: Arc<dyn SparqlEndpoint> = Arc::new(EmptyStore);
        let ontology = OntologyProvider::new(
            OntologyConfig::Inline {
                text: ":Jaguar a owl:Class .".to_string(),
            },
            endpoint.clone(),
        );
        let tools = Arc::new(GraphQueryTools::new(
            endpoint.clone(),
            ontology,
            10,
            Duration::from_secs(1),
        ));
        let orchestrator = Orchestrator::new(
            Arc::new(EchoLlm),
            Arc::new(AllowAll),
            tools,
            ChatConfig::default(),
        );
        ChatHandler::new(Arc::new(InMemorySessionStore::new(ttl)), orchestrator, endpoint)
    }

    #[tokio::test]
    async fn test_turn_records_history() {
        let handler = handler(Duration::from_secs(60));
        let outcome = handler.submit_turn("s1", "Where do jaguars live?").await.unwrap();
        assert!(outcome.is_answered());

        let history = handler.get_history("s1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "You asked: Where do jaguars live?");
    }

    #[tokio::test]
    async fn test_clear_history() {
        let handler = handler(Duration::from_secs(60));
        handler.submit_turn("s1", "Jaguar weight?").await.unwrap();

        handler.clear_history("s1").await.unwrap();
        assert!(handler.get_history("s1").await.unwrap().is_empty());

        // Clearing an unknown session is a no-op
        handler.clear_history("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_session_has_empty_history() {
        let handler = handler(Duration::from_secs(60));
        assert!(handler.get_history("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_purge() {
        let handler = handler(Duration::from_millis(10));
        handler.submit_turn("s1", "Jaguar range?").await.unwrap();
        handler.submit_turn("s2", "Jaguar prey?").await.unwrap();

        handler.delete_session("s1").await.unwrap();
        assert!(handler.get_history("s1").await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handler.purge_expired().await.unwrap(), 1);
    }
}

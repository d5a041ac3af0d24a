use thiserror::Error;

use crate::chat::config::{
    ChatConfig, GraphStoreConfig, GuardrailConfig, LlmProviderConfig, LlmProviderType,
    MemoryStrategy, OntologyConfig,
};
use crate::config::{ServerSettings, Settings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    fn invalid(field: &str, reason: &str) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Check every section and report all problems at once
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(&settings.server, &mut errors);
        Self::validate_llm("llm", &settings.llm, &mut errors);
        Self::validate_guardrail(&settings.guardrail, &mut errors);
        Self::validate_graph_store(&settings.graph_store, &mut errors);
        Self::validate_ontology(&settings.ontology, &mut errors);
        Self::validate_chat(&settings.chat, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings, errors: &mut Vec<ValidationError>) {
        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::invalid(
                "server.port",
                "Port must be greater than 0",
            ));
        }

        if server.session_sweep_seconds == 0 {
            errors.push(ValidationError::invalid(
                "server.session_sweep_seconds",
                "Must be greater than 0",
            ));
        }
    }

    fn validate_llm(prefix: &str, llm: &LlmProviderConfig, errors: &mut Vec<ValidationError>) {
        if llm.model.trim().is_empty() {
            errors.push(ValidationError::MissingField(format!("{}.model", prefix)));
        }

        if llm.provider == LlmProviderType::AzureOpenAI && llm.base_url.is_none() {
            errors.push(ValidationError::MissingField(format!(
                "{}.base_url (required for Azure OpenAI)",
                prefix
            )));
        }

        if let Some(temperature) = llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                errors.push(ValidationError::invalid(
                    &format!("{}.temperature", prefix),
                    "Must be between 0.0 and 2.0",
                ));
            }
        }

        if llm.timeout_seconds == 0 {
            errors.push(ValidationError::invalid(
                &format!("{}.timeout_seconds", prefix),
                "Must be greater than 0",
            ));
        }
    }

    fn validate_guardrail(guardrail: &GuardrailConfig, errors: &mut Vec<ValidationError>) {
        if let Some(llm) = &guardrail.llm {
            Self::validate_llm("guardrail.llm", llm, errors);
        }

        if guardrail.max_input_chars == 0 {
            errors.push(ValidationError::invalid(
                "guardrail.max_input_chars",
                "Must be greater than 0",
            ));
        }

        if guardrail.timeout_seconds == 0 {
            errors.push(ValidationError::invalid(
                "guardrail.timeout_seconds",
                "Must be greater than 0",
            ));
        }
    }

    fn validate_graph_store(store: &GraphStoreConfig, errors: &mut Vec<ValidationError>) {
        if !store.url.starts_with("http://") && !store.url.starts_with("https://") {
            errors.push(ValidationError::invalid(
                "graph_store.url",
                "Must be an http(s) URL",
            ));
        }

        if store.repository.trim().is_empty() {
            errors.push(ValidationError::MissingField(
                "graph_store.repository".to_string(),
            ));
        }

        if store.max_rows == 0 {
            errors.push(ValidationError::invalid(
                "graph_store.max_rows",
                "Must be greater than 0",
            ));
        }

        if store.timeout_seconds == 0 {
            errors.push(ValidationError::invalid(
                "graph_store.timeout_seconds",
                "Must be greater than 0",
            ));
        }
    }

    fn validate_ontology(ontology: &OntologyConfig, errors: &mut Vec<ValidationError>) {
        match ontology {
            OntologyConfig::Inline { text } if text.trim().is_empty() => {
                errors.push(ValidationError::MissingField("ontology.text".to_string()));
            }
            OntologyConfig::File { path, .. } if path.trim().is_empty() => {
                errors.push(ValidationError::MissingField("ontology.path".to_string()));
            }
            _ => {}
        }
    }

    fn validate_chat(chat: &ChatConfig, errors: &mut Vec<ValidationError>) {
        if chat.domain.trim().is_empty() {
            errors.push(ValidationError::MissingField("chat.domain".to_string()));
        }

        if chat
            .system_prompt
            .as_deref()
            .is_some_and(|prompt| prompt.trim().is_empty())
        {
            errors.push(ValidationError::invalid(
                "chat.system_prompt",
                "Must not be empty when set",
            ));
        }

        for (field, value) in [
            ("chat.model_timeout_seconds", chat.model_timeout_seconds),
            ("chat.tool_timeout_seconds", chat.tool_timeout_seconds),
            ("chat.session_ttl_seconds", chat.session_ttl_seconds),
        ] {
            if value == 0 {
                errors.push(ValidationError::invalid(field, "Must be greater than 0"));
            }
        }

        if let MemoryStrategy::SlidingWindow { size: 0 } = chat.memory {
            errors.push(ValidationError::invalid(
                "chat.memory.size",
                "Window must keep at least the current message",
            ));
        }
    }
}

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod validator;

use crate::chat::config::{
    ChatConfig, GraphStoreConfig, GuardrailConfig, LlmProviderConfig, OntologyConfig,
};
use crate::cli::Cli;

/// Prefix of environment variables overriding file settings,
/// e.g. `GRAPHCHAT__GRAPH_STORE__URL`
pub const ENV_PREFIX: &str = "GRAPHCHAT";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    /// Model answering the questions
    pub llm: LlmProviderConfig,
    #[serde(default)]
    pub guardrail: GuardrailConfig,
    #[serde(default)]
    pub graph_store: GraphStoreConfig,
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Interval of the idle session sweep in seconds
    #[serde(default = "default_sweep_interval")]
    pub session_sweep_seconds: u64,
}

fn default_sweep_interval() -> u64 {
    60
}

impl Settings {
    /// Create settings from CLI arguments (includes config file, environment and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load(&cli.config)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file (extension optional) and the environment
    pub fn from_path(path: &Path) -> Result<Self, anyhow::Error> {
        let settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("llm.model", "gpt-4o-mini")?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(url) = &cli.graph_url {
            self.graph_store.url = url.clone();
        }
        if let Some(repository) = &cli.repository {
            self.graph_store.repository = repository.clone();
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Model used by the safety screen
    pub fn guardrail_llm(&self) -> &LlmProviderConfig {
        self.guardrail.llm.as_ref().unwrap_or(&self.llm)
    }
}

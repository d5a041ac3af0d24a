//! Azure OpenAI provider

use async_trait::async_trait;
use std::env;

use super::openai::{AuthStyle, OpenAiProvider};
use super::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::chat::config::LlmProviderConfig;
use crate::chat::error::{LlmError, LlmResult};

const DEFAULT_API_VERSION: &str = "2024-10-21";

/// Azure OpenAI LLM Provider
/// Uses the same API format as OpenAI but with Azure-specific endpoints
pub struct AzureOpenAiProvider {
    inner: OpenAiProvider,
}

impl AzureOpenAiProvider {
    /// Create a new Azure OpenAI provider from configuration
    pub fn new(config: &LlmProviderConfig) -> LlmResult<Self> {
        let env_var = config.api_key_env.as_deref().unwrap_or("AZURE_OPENAI_API_KEY");
        let api_key = env::var(env_var).map_err(|_| {
            LlmError::Authentication(format!("Environment variable {} not set", env_var))
        })?;

        Self::with_api_key(config, api_key)
    }

    /// Create a provider with an explicit API key
    pub fn with_api_key(config: &LlmProviderConfig, api_key: impl Into<String>) -> LlmResult<Self> {
        let inner = OpenAiProvider::build(
            config,
            api_key.into(),
            deployment_url(config)?,
            AuthStyle::ApiKeyHeader,
        )?;

        Ok(Self { inner })
    }
}

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}`
fn deployment_url(config: &LlmProviderConfig) -> LlmResult<String> {
    let base_url = config.base_url.as_deref().ok_or_else(|| {
        LlmError::InvalidRequest(
            "Azure OpenAI requires base_url to be set (e.g., https://your-resource.openai.azure.com)"
                .to_string(),
        )
    })?;
    let api_version = config.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION);

    Ok(format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        base_url.trim_end_matches('/'),
        config.model,
        api_version
    ))
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure-openai"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.inner.complete(request).await
    }
}

// Factory for creating chat clients from provider configuration

use anyhow::Result;
use std::sync::Arc;

use crate::models::Provider;
use crate::openai::OpenAIClient;
use crate::traits::ChatClient;

/// Everything needed to reach one provider for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: String,
    /// Overrides the provider's default endpoint (local gateways, tests)
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Builds a chat client per request, since keys arrive with each request
pub trait ClientFactory: Send + Sync {
    fn create_chat_client(&self, config: ProviderConfig) -> Result<Arc<dyn ChatClient>>;
}

/// Production factory: OpenAI-compatible HTTP clients
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn create_chat_client(&self, config: ProviderConfig) -> Result<Arc<dyn ChatClient>> {
        let client = OpenAIClient::with_base_url(config.api_key.clone(), config.base_url())?;
        Ok(Arc::new(client))
    }
}

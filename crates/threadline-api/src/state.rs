use std::sync::Arc;

use threadline_llm::{
    get_model_config, ApiKeys, ChatClient, ChatOptions, ClientFactory, ModelConfig, Provider,
    ProviderConfig,
};
use threadline_persist::{ChatStore, Identity};
use threadline_summary::{Summarizer, SummaryRequest};

use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::generation::GenerationRegistry;

/// Shared application state passed to all handlers
///
/// Chat clients are not stored here: provider keys arrive with each request,
/// so handlers build one per request through `clients`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: ChatStore,
    pub clients: Arc<dyn ClientFactory>,
    pub summarizer: Arc<Summarizer>,
    pub generations: Arc<GenerationRegistry>,
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(config: Config, store: ChatStore, clients: Arc<dyn ClientFactory>) -> Self {
        let summarizer = Summarizer::new(store.clone(), Arc::clone(&clients))
            .with_model(config.llm.summary_model.clone());
        let jwt = JwtVerifier::new(&config.auth.jwt_secret, config.auth.issuer.as_deref());

        Self {
            config: Arc::new(config),
            store,
            clients,
            summarizer: Arc::new(summarizer),
            generations: Arc::new(GenerationRegistry::new()),
            jwt: Arc::new(jwt),
        }
    }

    /// Pick the requested (or default) model and build a client with the
    /// matching provider key
    pub fn chat_client(
        &self,
        requested: Option<&str>,
        keys: &ApiKeys,
    ) -> ApiResult<(ModelConfig, Arc<dyn ChatClient>)> {
        let name = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.llm.default_model);

        let model = get_model_config(name).ok_or_else(|| ApiError::UnknownModel(name.to_string()))?;
        let key = keys
            .get(model.provider)
            .ok_or_else(|| ApiError::missing_key(model.provider))?;

        let client = self
            .clients
            .create_chat_client(ProviderConfig::new(model.provider, key))?;
        Ok((model, client))
    }

    /// Generation parameters from `[llm]`
    pub fn chat_options(&self) -> ChatOptions {
        let llm = &self.config.llm;
        let mut options = ChatOptions::new();
        if let Some(temperature) = llm.temperature {
            options = options.temperature(temperature);
        }
        if let Some(max_tokens) = llm.max_tokens {
            options = options.max_tokens(max_tokens);
        }
        if let Some(effort) = &llm.reasoning_effort {
            options = options.reasoning_effort(effort.clone());
        }
        options
    }

    /// Edit and regenerate rewrite history and re-summarize, so they need the
    /// required provider keys regardless of the chosen model
    pub fn require_keys(&self, keys: &ApiKeys) -> ApiResult<()> {
        if keys.has_required_keys() {
            return Ok(());
        }
        let missing = Provider::ALL
            .into_iter()
            .find(|p| p.is_required() && keys.get(*p).is_none())
            .unwrap_or(Provider::Google);
        Err(ApiError::missing_key(missing))
    }

    /// Fire-and-forget summary. Skipped with a warning when no Google key
    /// was supplied; returns whether a task was spawned.
    pub fn fire_summary(&self, caller: &Identity, keys: &ApiKeys, request: SummaryRequest) -> bool {
        let Some(key) = keys.get(Provider::Google) else {
            tracing::warn!(
                message_id = %request.message_id,
                "No Google API key supplied, skipping message summary"
            );
            return false;
        };

        self.summarizer.spawn(caller.clone(), key.to_string(), request);
        true
    }
}

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use threadline_llm::{collect_stream, ChatRequest, ClientFactory, Message, Provider, ProviderConfig};
use threadline_persist::{ChatStore, Identity, MessageSummary};

use crate::templates::{render_prompt, DEFAULT_TITLE_PROMPT};

pub const DEFAULT_SUMMARY_MODEL: &str = "gemini-2.0-flash";

const MAX_TITLE_CHARS: usize = 80;

/// What to summarize, and whether the result should also become the thread title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub prompt: String,
    pub thread_id: String,
    pub message_id: String,
    #[serde(default)]
    pub is_title: bool,
}

/// Finished completion, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub title: String,
    pub is_title: bool,
    pub thread_id: String,
    pub message_id: String,
}

/// Generates summaries through the Google provider and stores them.
pub struct Summarizer {
    store: ChatStore,
    clients: Arc<dyn ClientFactory>,
    model: String,
}

impl Summarizer {
    pub fn new(store: ChatStore, clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            store,
            clients,
            model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Run the completion; `None` when the model answered with nothing usable
    pub async fn complete(&self, api_key: &str, prompt: &str) -> Result<Option<String>> {
        let client = self
            .clients
            .create_chat_client(ProviderConfig::new(Provider::Google, api_key))?;

        let request = ChatRequest::new(
            self.model.clone(),
            vec![Message::human(render_prompt(DEFAULT_TITLE_PROMPT, prompt))],
        );

        let stream = client.chat_stream(request).await?;
        let (_, completion) = collect_stream(stream).await?;

        Ok(clean_title(&completion))
    }

    /// Store a finished summary: title first (only when asked), then the row
    pub async fn process_summary(
        &self,
        caller: &Identity,
        payload: SummaryPayload,
    ) -> threadline_persist::Result<MessageSummary> {
        if payload.is_title {
            self.store
                .update_title(Some(caller), &payload.thread_id, &payload.title)
                .await?;
        }

        let summary = self
            .store
            .create_summary(Some(caller), &payload.thread_id, &payload.message_id, &payload.title)
            .await?;

        tracing::info!(
            thread_id = %payload.thread_id,
            message_id = %payload.message_id,
            is_title = payload.is_title,
            "Message summary saved"
        );
        Ok(summary)
    }

    /// Completion followed by storage. `Ok(None)` when the completion was empty.
    pub async fn generate_summary(
        &self,
        caller: &Identity,
        api_key: &str,
        request: SummaryRequest,
    ) -> Result<Option<MessageSummary>> {
        let Some(title) = self.complete(api_key, &request.prompt).await? else {
            tracing::debug!(message_id = %request.message_id, "Empty summary completion");
            return Ok(None);
        };

        let payload = SummaryPayload {
            title,
            is_title: request.is_title,
            thread_id: request.thread_id,
            message_id: request.message_id,
        };
        Ok(Some(self.process_summary(caller, payload).await?))
    }

    /// Fire-and-forget: failures are logged, never retried
    pub fn spawn(
        self: &Arc<Self>,
        caller: Identity,
        api_key: String,
        request: SummaryRequest,
    ) -> JoinHandle<Option<MessageSummary>> {
        let summarizer = Arc::clone(self);
        tokio::spawn(async move {
            let message_id = request.message_id.clone();
            match summarizer.generate_summary(&caller, &api_key, request).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(message_id = %message_id, error = %e, "Failed to generate message summary");
                    None
                }
            }
        })
    }
}

/// Trim whitespace and wrapping quotes, cap the length
fn clean_title(raw: &str) -> Option<String> {
    let title = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    if title.is_empty() {
        return None;
    }
    Some(title.chars().take(MAX_TITLE_CHARS).collect())
}

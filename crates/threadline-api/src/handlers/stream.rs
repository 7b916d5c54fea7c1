use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;

use threadline_llm::{ApiKeys, ChatClient, ChatOptions, ChatRequest, ModelConfig, StreamEvent};
use threadline_persist::{
    ChatStore, Identity, Message, MessagePart, MessageRole, NewMessage, Transcript,
};
use threadline_summary::SummaryRequest;

use crate::{
    auth::Caller,
    error::{ApiError, ApiResult},
    routes::messages::require_content,
    state::AppState,
};

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: String,
    /// Display name or provider model id; defaults to the configured model
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EditMessageRequest {
    pub content: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RegenerateRequest {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Send a message and stream the response using Server-Sent Events
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/messages",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Streaming response", content_type = "text/event-stream"),
        (status = 400, description = "Empty message, unknown model or missing provider key"),
        (status = 403, description = "Thread not accessible")
    ),
    tag = "messages"
)]
pub async fn send_message_stream(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    headers: HeaderMap,
    Path(thread_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let identity = caller.require()?;
    require_content(&req.content)?;

    let keys = ApiKeys::from_headers(&headers);
    let (model, client) = state.chat_client(req.model.as_deref(), &keys)?;

    // 1. Ownership, then make room for the new generation
    state.store.get_thread(Some(&identity), &thread_id).await?;
    state.generations.stop(&thread_id).await;

    // 2. Save user message
    let user_message = state
        .store
        .send_message(Some(&identity), &thread_id, NewMessage::user(req.content.clone()))
        .await?;

    // 3. Rebuild the transcript the model will see
    let transcript = Transcript::new(state.store.list_messages(Some(&identity), &thread_id).await?);

    // 4. Every user message is summarized; the first one also names the thread
    state.fire_summary(
        &identity,
        &keys,
        SummaryRequest {
            prompt: req.content,
            thread_id: thread_id.clone(),
            message_id: user_message.id.clone(),
            is_title: transcript.len() == 1,
        },
    );

    Ok(start_generation(&state, identity, thread_id, model, client, transcript).await)
}

/// Replace a user message and everything after it, then stream a new reply
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/messages/{message_id}/edit",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("message_id" = String, Path, description = "Message being edited")
    ),
    request_body = EditMessageRequest,
    responses(
        (status = 200, description = "Streaming response", content_type = "text/event-stream"),
        (status = 400, description = "Empty message, not a user message, or missing provider key"),
        (status = 403, description = "Thread not accessible"),
        (status = 404, description = "Message not found in this thread")
    ),
    tag = "messages"
)]
pub async fn edit_message_stream(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    headers: HeaderMap,
    Path((thread_id, message_id)): Path<(String, String)>,
    Json(req): Json<EditMessageRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let identity = caller.require()?;
    require_content(&req.content)?;

    let keys = ApiKeys::from_headers(&headers);
    state.require_keys(&keys)?;
    let (model, client) = state.chat_client(req.model.as_deref(), &keys)?;

    let mut transcript =
        Transcript::new(state.store.list_messages(Some(&identity), &thread_id).await?);
    let edited = transcript
        .get(&message_id)
        .ok_or_else(|| ApiError::MessageNotFound(message_id.clone()))?;
    if edited.role != MessageRole::User {
        return Err(ApiError::BadRequest("Only user messages can be edited".to_string()));
    }

    // 1. Stop the active generation
    state.generations.stop(&thread_id).await;

    // 2. Drop the edited message and its trailing messages
    state
        .store
        .delete_trailing(Some(&identity), &thread_id, &message_id)
        .await?;
    transcript.truncate_from(&message_id);

    // 3. Insert the replacement
    let replacement = state
        .store
        .send_message(Some(&identity), &thread_id, NewMessage::user(req.content.clone()))
        .await?;
    transcript.push(replacement.clone());

    // 4. Summarize the new message
    state.fire_summary(
        &identity,
        &keys,
        SummaryRequest {
            prompt: req.content,
            thread_id: thread_id.clone(),
            message_id: replacement.id,
            is_title: false,
        },
    );

    Ok(start_generation(&state, identity, thread_id, model, client, transcript).await)
}

/// Regenerate the reply to a user message, or replace an assistant reply
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/messages/{message_id}/regenerate",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("message_id" = String, Path, description = "User or assistant message to regenerate from")
    ),
    request_body = RegenerateRequest,
    responses(
        (status = 200, description = "Streaming response", content_type = "text/event-stream"),
        (status = 400, description = "Unsupported role or missing provider key"),
        (status = 403, description = "Thread not accessible"),
        (status = 404, description = "Message not found in this thread")
    ),
    tag = "messages"
)]
pub async fn regenerate_stream(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    headers: HeaderMap,
    Path((thread_id, message_id)): Path<(String, String)>,
    Json(req): Json<RegenerateRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let identity = caller.require()?;

    let keys = ApiKeys::from_headers(&headers);
    state.require_keys(&keys)?;
    let (model, client) = state.chat_client(req.model.as_deref(), &keys)?;

    let mut transcript =
        Transcript::new(state.store.list_messages(Some(&identity), &thread_id).await?);
    let target = transcript
        .get(&message_id)
        .cloned()
        .ok_or_else(|| ApiError::MessageNotFound(message_id.clone()))?;
    if !matches!(target.role, MessageRole::User | MessageRole::Assistant) {
        return Err(ApiError::BadRequest(format!(
            "Cannot regenerate from a {} message",
            target.role.as_str()
        )));
    }

    state.generations.stop(&thread_id).await;

    state
        .store
        .delete_trailing(Some(&identity), &thread_id, &message_id)
        .await?;
    transcript.truncate_from(&message_id);

    // A user message is re-inserted so the new reply follows it. Its summary
    // went with the deleted row, so the new copy gets one of its own.
    if target.role == MessageRole::User {
        let reinserted = state
            .store
            .send_message(Some(&identity), &thread_id, NewMessage::from(&target))
            .await?;
        state.fire_summary(
            &identity,
            &keys,
            SummaryRequest {
                prompt: reinserted.content.clone(),
                thread_id: thread_id.clone(),
                message_id: reinserted.id.clone(),
                is_title: false,
            },
        );
        transcript.push(reinserted);
    }

    Ok(start_generation(&state, identity, thread_id, model, client, transcript).await)
}

/// Abort the thread's active generation
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/stop",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Generation stopped (or none was running)", body = StopResponse),
        (status = 403, description = "Thread not accessible")
    ),
    tag = "messages"
)]
pub async fn stop_generation(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<StopResponse>> {
    state.store.get_thread(caller.identity(), &thread_id).await?;
    let stopped = state.generations.stop(&thread_id).await;

    Ok(Json(StopResponse { stopped }))
}

/// Everything a generation task needs once the request has returned
struct GenerationJob {
    store: ChatStore,
    identity: Identity,
    thread_id: String,
    model: ModelConfig,
    options: ChatOptions,
    client: Arc<dyn ChatClient>,
    transcript: Transcript,
    events: mpsc::Sender<Event>,
}

async fn start_generation(
    state: &AppState,
    identity: Identity,
    thread_id: String,
    model: ModelConfig,
    client: Arc<dyn ChatClient>,
    transcript: Transcript,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let job = GenerationJob {
        store: state.store.clone(),
        identity,
        thread_id: thread_id.clone(),
        model,
        options: state.chat_options(),
        client,
        transcript,
        events: tx.clone(),
    };
    state.generations.start(&thread_id, tx, run_generation(job)).await;

    let stream = ReceiverStream::new(rx).map(Ok::<Event, Infallible>);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn run_generation(job: GenerationJob) {
    tracing::info!(
        thread_id = %job.thread_id,
        model = job.model.model_id,
        history = job.transcript.len(),
        "Generating reply"
    );

    match stream_reply(&job).await {
        Ok(message) => {
            tracing::info!(thread_id = %job.thread_id, message_id = %message.id, "Reply stored");
            emit(
                &job.events,
                "done",
                json!({ "status": "completed", "message_id": message.id }),
            )
            .await;
        }
        Err(e) => {
            tracing::warn!(thread_id = %job.thread_id, error = %e, "Generation failed");
            emit(&job.events, "error", json!({ "error": e.to_string() })).await;
        }
    }
}

/// Forward deltas to the client, then persist the assembled reply
async fn stream_reply(job: &GenerationJob) -> anyhow::Result<Message> {
    let request = ChatRequest::new(job.model.model_id, job.transcript.to_llm_messages())
        .with_options(job.options.clone());
    let mut stream = job.client.chat_stream(request).await?;

    let mut reasoning = String::new();
    let mut text = String::new();

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Reasoning { content } => {
                emit(&job.events, "reasoning", json!({ "content": content })).await;
                reasoning.push_str(&content);
            }
            StreamEvent::Message { content } => {
                emit(&job.events, "message", json!({ "content": content })).await;
                text.push_str(&content);
            }
            StreamEvent::Done { .. } => break,
        }
    }

    let mut parts = Vec::new();
    if !reasoning.is_empty() {
        parts.push(MessagePart::Reasoning { reasoning });
    }
    parts.push(MessagePart::Text { text: text.clone() });

    let message = job
        .store
        .send_message(
            Some(&job.identity),
            &job.thread_id,
            NewMessage::assistant(text).with_parts(parts),
        )
        .await?;
    Ok(message)
}

/// Client disconnects are ignored; the reply is still stored
async fn emit(events: &mpsc::Sender<Event>, name: &str, data: serde_json::Value) {
    let event = Event::default().event(name).data(data.to_string());
    let _ = events.send(event).await;
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use threadline_persist::{Message, MessagePart, MessageRole, NewMessage};

use crate::{
    auth::Caller,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message_id: String,
    pub thread_id: String,
    #[schema(value_type = String, example = "user")]
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub parts: Option<Vec<MessagePart>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppendMessageRequest {
    #[schema(value_type = String, example = "assistant")]
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrailingDeletionResponse {
    /// Creation time of the cut-point message
    pub cutoff: DateTime<Utc>,
    pub deleted: Vec<String>,
}

/// List messages in a thread, oldest first
#[utoipa::path(
    get,
    path = "/threads/{thread_id}/messages",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "List of messages", body = ListMessagesResponse),
        (status = 403, description = "Thread not accessible")
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ListMessagesResponse>> {
    let messages = state.store.list_messages(caller.identity(), &thread_id).await?;

    Ok(Json(ListMessagesResponse {
        messages: messages.into_iter().map(message_to_response).collect(),
    }))
}

/// Persist a message without generating a reply
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/messages/append",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = AppendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = MessageResponse),
        (status = 403, description = "Thread not accessible")
    ),
    tag = "messages"
)]
pub async fn append_message(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
    Json(req): Json<AppendMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let mut message = NewMessage::new(req.role, req.content);
    message.parts = req.parts;

    let message = state
        .store
        .send_message(caller.identity(), &thread_id, message)
        .await?;

    Ok((StatusCode::CREATED, Json(message_to_response(message))))
}

/// Delete a single message and its summaries
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}/messages/{message_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("message_id" = String, Path, description = "Message ID")
    ),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 403, description = "Thread not accessible"),
        (status = 404, description = "Message not found in this thread")
    ),
    tag = "messages"
)]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((thread_id, message_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .store
        .delete_message(caller.identity(), &thread_id, &message_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a message and everything created after it
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}/messages/{message_id}/trailing",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("message_id" = String, Path, description = "Cut-point message ID")
    ),
    responses(
        (status = 200, description = "Messages deleted", body = TrailingDeletionResponse),
        (status = 403, description = "Thread not accessible"),
        (status = 404, description = "Message not found in this thread")
    ),
    tag = "messages"
)]
pub async fn delete_trailing(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((thread_id, message_id)): Path<(String, String)>,
) -> ApiResult<Json<TrailingDeletionResponse>> {
    state.store.get_thread(caller.identity(), &thread_id).await?;
    // A reply still streaming would land after the cut
    state.generations.stop(&thread_id).await;

    let deletion = state
        .store
        .delete_trailing(caller.identity(), &thread_id, &message_id)
        .await?;

    Ok(Json(TrailingDeletionResponse {
        cutoff: deletion.cutoff,
        deleted: deletion.deleted,
    }))
}

pub(crate) fn message_to_response(message: Message) -> MessageResponse {
    MessageResponse {
        message_id: message.id,
        thread_id: message.thread_id,
        role: message.role,
        content: message.content,
        parts: message.parts,
        created_at: message.created_at,
    }
}

pub(crate) fn require_content(content: &str) -> ApiResult<()> {
    if content.trim().is_empty() {
        return Err(ApiError::BadRequest("Message content must not be empty".to_string()));
    }
    Ok(())
}

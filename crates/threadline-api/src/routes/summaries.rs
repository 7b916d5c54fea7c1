use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use threadline_llm::{ApiKeys, Provider};
use threadline_persist::MessageSummary;
use threadline_summary::SummaryRequest;

use crate::{
    auth::Caller,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub summary_id: String,
    pub thread_id: String,
    pub message_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListSummariesResponse {
    pub summaries: Vec<SummaryResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSummaryRequest {
    pub message_id: String,
    pub content: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TriggerSummaryRequest {
    /// Also rename the thread with the result
    #[serde(default)]
    pub is_title: bool,
    /// Text to summarize; defaults to the message content
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TriggerSummaryResponse {
    pub message_id: String,
    pub scheduled: bool,
}

/// List summaries of a thread, oldest first
#[utoipa::path(
    get,
    path = "/threads/{thread_id}/summaries",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "List of summaries", body = ListSummariesResponse),
        (status = 403, description = "Thread not accessible")
    ),
    tag = "summaries"
)]
pub async fn list_summaries(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ListSummariesResponse>> {
    let summaries = state.store.list_summaries(caller.identity(), &thread_id).await?;

    Ok(Json(ListSummariesResponse {
        summaries: summaries.into_iter().map(summary_to_response).collect(),
    }))
}

/// Store a summary produced elsewhere
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/summaries",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = CreateSummaryRequest,
    responses(
        (status = 201, description = "Summary stored", body = SummaryResponse),
        (status = 403, description = "Thread not accessible"),
        (status = 404, description = "Message not found in this thread")
    ),
    tag = "summaries"
)]
pub async fn create_summary(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
    Json(req): Json<CreateSummaryRequest>,
) -> ApiResult<(StatusCode, Json<SummaryResponse>)> {
    let summary = state
        .store
        .create_summary(caller.identity(), &thread_id, &req.message_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(summary_to_response(summary))))
}

/// Generate a summary for a message in the background
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/messages/{message_id}/summary",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("message_id" = String, Path, description = "Message ID")
    ),
    request_body = TriggerSummaryRequest,
    responses(
        (status = 202, description = "Summary scheduled", body = TriggerSummaryResponse),
        (status = 400, description = "Missing Google API key"),
        (status = 403, description = "Thread not accessible"),
        (status = 404, description = "Message not found in this thread")
    ),
    tag = "summaries"
)]
pub async fn trigger_summary(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    headers: HeaderMap,
    Path((thread_id, message_id)): Path<(String, String)>,
    Json(req): Json<TriggerSummaryRequest>,
) -> ApiResult<(StatusCode, Json<TriggerSummaryResponse>)> {
    let identity = caller.require()?;
    let keys = ApiKeys::from_headers(&headers);
    if keys.get(Provider::Google).is_none() {
        return Err(ApiError::missing_key(Provider::Google));
    }

    let message = state
        .store
        .get_message(Some(&identity), &thread_id, &message_id)
        .await?;

    let request = SummaryRequest {
        prompt: req.prompt.unwrap_or(message.content),
        thread_id,
        message_id: message.id,
        is_title: req.is_title,
    };
    let message_id = request.message_id.clone();
    let scheduled = state.fire_summary(&identity, &keys, request);

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerSummaryResponse { message_id, scheduled }),
    ))
}

fn summary_to_response(summary: MessageSummary) -> SummaryResponse {
    SummaryResponse {
        summary_id: summary.id,
        thread_id: summary.thread_id,
        message_id: summary.message_id,
        content: summary.content,
        created_at: summary.created_at,
    }
}

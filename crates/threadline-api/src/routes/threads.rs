use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use threadline_persist::Thread;

use crate::{auth::Caller, error::{ApiError, ApiResult}, state::AppState};

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateThreadRequest {
    /// Defaults to "New Chat"
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateThreadRequest {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadResponse {
    pub thread_id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListThreadsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: Option<i64>,
    /// Case-insensitive title search
    #[serde(default)]
    pub q: Option<String>,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListThreadsResponse {
    pub threads: Vec<ThreadResponse>,
    pub has_more: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteThreadsResponse {
    pub deleted: usize,
}

/// Create a new thread
#[utoipa::path(
    post,
    path = "/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 201, description = "Thread created", body = ThreadResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<ThreadResponse>)> {
    let thread = state.store.create_thread(caller.identity(), req.title).await?;

    Ok((StatusCode::CREATED, Json(thread_to_response(thread))))
}

/// List (or search) the caller's threads, most recently active first
#[utoipa::path(
    get,
    path = "/threads",
    params(ListThreadsQuery),
    responses(
        (status = 200, description = "List of threads", body = ListThreadsResponse)
    ),
    tag = "threads"
)]
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<ListThreadsQuery>,
) -> ApiResult<Json<ListThreadsResponse>> {
    let limit = query.limit.clamp(1, 100);

    let threads = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => state.store.search_threads(caller.identity(), q, limit).await?,
        None => {
            state
                .store
                .list_threads(caller.identity(), Some(limit), query.skip)
                .await?
        }
    };

    let has_more = threads.len() as i64 == limit;
    let thread_responses: Vec<ThreadResponse> =
        threads.into_iter().map(thread_to_response).collect();

    Ok(Json(ListThreadsResponse {
        threads: thread_responses,
        has_more,
    }))
}

/// Get a specific thread by ID
#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread details", body = ThreadResponse),
        (status = 403, description = "Thread not accessible")
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadResponse>> {
    let thread = state.store.get_thread(caller.identity(), &thread_id).await?;

    Ok(Json(thread_to_response(thread)))
}

/// Rename a thread
#[utoipa::path(
    patch,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = UpdateThreadRequest,
    responses(
        (status = 200, description = "Thread renamed", body = ThreadResponse),
        (status = 400, description = "Empty title"),
        (status = 403, description = "Thread not accessible")
    ),
    tag = "threads"
)]
pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
    Json(req): Json<UpdateThreadRequest>,
) -> ApiResult<Json<ThreadResponse>> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".to_string()));
    }

    let thread = state
        .store
        .update_title(caller.identity(), &thread_id, title)
        .await?;

    Ok(Json(thread_to_response(thread)))
}

/// Delete a thread with its messages and summaries
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 204, description = "Thread deleted"),
        (status = 403, description = "Thread not accessible")
    ),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.get_thread(caller.identity(), &thread_id).await?;
    state.generations.stop(&thread_id).await;
    state.store.delete_thread(caller.identity(), &thread_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete every thread of the caller
#[utoipa::path(
    delete,
    path = "/threads",
    responses(
        (status = 200, description = "Threads deleted", body = DeleteThreadsResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "threads"
)]
pub async fn delete_all_threads(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<DeleteThreadsResponse>> {
    // Active replies are cut before their threads go away
    for thread in state.store.list_threads(caller.identity(), None, None).await? {
        state.generations.stop(&thread.id).await;
    }
    let deleted = state.store.delete_all_threads(caller.identity()).await?;

    Ok(Json(DeleteThreadsResponse { deleted }))
}

pub(crate) fn thread_to_response(thread: Thread) -> ThreadResponse {
    ThreadResponse {
        thread_id: thread.id,
        user_id: thread.user_id,
        title: thread.title,
        created_at: thread.created_at,
        last_message_at: thread.last_message_at,
    }
}

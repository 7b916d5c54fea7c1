use axum::Json;
use utoipa::OpenApi;

use crate::handlers::stream;
use crate::routes::{health, messages, summaries, threads};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        threads::create_thread,
        threads::list_threads,
        threads::get_thread,
        threads::update_thread,
        threads::delete_thread,
        threads::delete_all_threads,
        messages::list_messages,
        messages::append_message,
        messages::delete_message,
        messages::delete_trailing,
        stream::send_message_stream,
        stream::edit_message_stream,
        stream::regenerate_stream,
        stream::stop_generation,
        summaries::list_summaries,
        summaries::create_summary,
        summaries::trigger_summary,
    ),
    components(schemas(
        health::HealthResponse,
        threads::CreateThreadRequest,
        threads::UpdateThreadRequest,
        threads::ThreadResponse,
        threads::ListThreadsResponse,
        threads::DeleteThreadsResponse,
        messages::MessageResponse,
        messages::ListMessagesResponse,
        messages::AppendMessageRequest,
        messages::TrailingDeletionResponse,
        stream::SendMessageRequest,
        stream::EditMessageRequest,
        stream::RegenerateRequest,
        stream::StopResponse,
        summaries::SummaryResponse,
        summaries::ListSummariesResponse,
        summaries::CreateSummaryRequest,
        summaries::TriggerSummaryRequest,
        summaries::TriggerSummaryResponse,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "threads", description = "Conversation threads"),
        (name = "messages", description = "Messages and streamed generation"),
        (name = "summaries", description = "Message summaries and thread titles")
    )
)]
pub struct ApiDoc;

/// OpenAPI document as JSON
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

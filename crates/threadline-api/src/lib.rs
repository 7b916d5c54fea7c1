pub mod auth;
pub mod config;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::handlers::stream;
use crate::middleware::logging;
use crate::routes::{health, messages, summaries, threads};
use crate::state::AppState;

/// Assemble routes and middleware around shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Threads
        .route(
            "/threads",
            get(threads::list_threads)
                .post(threads::create_thread)
                .delete(threads::delete_all_threads),
        )
        .route(
            "/threads/:thread_id",
            get(threads::get_thread)
                .patch(threads::update_thread)
                .delete(threads::delete_thread),
        )
        // Messages
        .route(
            "/threads/:thread_id/messages",
            get(messages::list_messages).post(stream::send_message_stream),
        )
        .route("/threads/:thread_id/messages/append", post(messages::append_message))
        .route(
            "/threads/:thread_id/messages/:message_id",
            delete(messages::delete_message),
        )
        .route(
            "/threads/:thread_id/messages/:message_id/trailing",
            delete(messages::delete_trailing),
        )
        .route(
            "/threads/:thread_id/messages/:message_id/edit",
            post(stream::edit_message_stream),
        )
        .route(
            "/threads/:thread_id/messages/:message_id/regenerate",
            post(stream::regenerate_stream),
        )
        .route(
            "/threads/:thread_id/messages/:message_id/summary",
            post(summaries::trigger_summary),
        )
        .route("/threads/:thread_id/stop", post(stream::stop_generation))
        // Summaries
        .route(
            "/threads/:thread_id/summaries",
            get(summaries::list_summaries).post(summaries::create_summary),
        )
        // Docs
        .route("/api-docs/openapi.json", get(openapi::openapi_json));

    let timeout = Duration::from_secs(state.config.llm.request_timeout_secs);

    api_routes
        .layer(axum_middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            let origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            cors = cors.allow_origin(origins);
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}

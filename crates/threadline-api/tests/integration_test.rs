use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response, StatusCode},
    Router,
};
use futures::{stream, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use threadline_api::{auth::Claims, build_router, config::Config, state::AppState};
use threadline_llm::traits::EventStream;
use threadline_llm::{
    ChatClient, ChatRequest, ChatResponse, ClientFactory, ProviderConfig, StreamEvent,
};
use threadline_persist::ChatStore;

const SECRET: &str = "test-secret";
const SUMMARY_MODEL: &str = "summary-model";
const GOOGLE_KEY: (&str, &str) = ("X-Google-API-Key", "google-key");
const OPENAI_KEY: (&str, &str) = ("X-OpenAI-API-Key", "openai-key");
/// A user message with this text gets a reply that never arrives in time
const SLOW: &str = "slow";

type Recorded = Arc<Mutex<Vec<ChatRequest>>>;

/// Replies "Hello!" with some reasoning; summary requests get "Greeting"
struct ScriptedClient {
    requests: Recorded,
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        Err(anyhow!("not scripted"))
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        self.requests.lock().unwrap().push(request.clone());

        if request.model == SUMMARY_MODEL {
            return Ok(Box::pin(stream::iter(vec![
                Ok(StreamEvent::Message { content: "Greeting".to_string() }),
                Ok(StreamEvent::Done { finish_reason: Some("stop".to_string()) }),
            ])));
        }

        if request.messages.last().and_then(|m| m.text()) == Some(SLOW) {
            let late = stream::once(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, anyhow::Error>(StreamEvent::Message { content: "LATE".to_string() })
            });
            let done = stream::iter(vec![Ok(StreamEvent::Done { finish_reason: None })]);
            return Ok(Box::pin(late.chain(done)));
        }

        Ok(Box::pin(stream::iter(vec![
            Ok(StreamEvent::Reasoning { content: "thinking".to_string() }),
            Ok(StreamEvent::Message { content: "Hello".to_string() }),
            Ok(StreamEvent::Message { content: "!".to_string() }),
            Ok(StreamEvent::Done { finish_reason: Some("stop".to_string()) }),
        ])))
    }
}

struct ScriptedFactory {
    requests: Recorded,
}

impl ClientFactory for ScriptedFactory {
    fn create_chat_client(&self, _config: ProviderConfig) -> Result<Arc<dyn ChatClient>> {
        Ok(Arc::new(ScriptedClient { requests: self.requests.clone() }))
    }
}

fn test_config_with(llm_extra: &str) -> Config {
    toml::from_str(&format!(
        r#"
        [server]
        host = "127.0.0.1"
        port = 0

        [cors]
        enabled = false
        origins = []

        [storage]
        backend = "memory"
        database = "test"

        [llm]
        default_model = "Gemini 2.5 Flash"
        summary_model = "{SUMMARY_MODEL}"
        request_timeout_secs = 30
        {llm_extra}

        [auth]
        jwt_secret = "{SECRET}"

        [logging]
        level = "debug"
        format = "pretty"
        "#
    ))
    .unwrap()
}

fn app_with(config: Config) -> (Router, ChatStore, Recorded) {
    let store = ChatStore::in_memory();
    let requests = Recorded::default();
    let factory = Arc::new(ScriptedFactory { requests: requests.clone() });
    let state = Arc::new(AppState::new(config, store.clone(), factory));
    (build_router(state), store, requests)
}

fn app() -> (Router, ChatStore) {
    let (router, store, _) = app_with(test_config_with(""));
    (router, store)
}

fn token(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        iat: None,
        iss: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

/// Sends a request and hands back the response with its body unread
async fn respond(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("Authorization", format!("Bearer {}", token(user)));
    }
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = match body {
        Some(body) => request
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

async fn read_body(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, String) {
    let response = respond(app, method, uri, user, headers, body).await;
    let status = response.status();
    (status, read_body(response).await)
}

async fn call_json(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, text) = call(app, method, uri, user, &[], body).await;
    let value = if text.is_empty() { Value::Null } else { serde_json::from_str(&text).unwrap() };
    (status, value)
}

async fn create_thread(app: &Router, user: &str) -> String {
    let (status, body) = call_json(app, Method::POST, "/threads", Some(user), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["thread_id"].as_str().unwrap().to_string()
}

async fn send(app: &Router, user: &str, thread_id: &str, content: &str) -> (StatusCode, String) {
    call(
        app,
        Method::POST,
        &format!("/threads/{}/messages", thread_id),
        Some(user),
        &[GOOGLE_KEY],
        Some(json!({ "content": content })),
    )
    .await
}

async fn messages(app: &Router, user: &str, thread_id: &str) -> Vec<Value> {
    let (status, body) = call_json(
        app,
        Method::GET,
        &format!("/threads/{}/messages", thread_id),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["messages"].as_array().unwrap().clone()
}

async fn summaries(app: &Router, user: &str, thread_id: &str) -> Vec<Value> {
    let (status, body) = call_json(
        app,
        Method::GET,
        &format!("/threads/{}/summaries", thread_id),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["summaries"].as_array().unwrap().clone()
}

/// Polls until the background summaries for the thread reach `count`
async fn wait_for_summaries(app: &Router, user: &str, thread_id: &str, count: usize) -> Vec<Value> {
    let mut found = Vec::new();
    for _ in 0..50 {
        found = summaries(app, user, thread_id).await;
        if found.len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    found
}

/// Starts a reply that stays in flight; the SSE body is left unread
async fn send_slow(app: &Router, user: &str, thread_id: &str) -> Response<Body> {
    let response = respond(
        app,
        Method::POST,
        &format!("/threads/{}/messages", thread_id),
        Some(user),
        &[GOOGLE_KEY],
        Some(json!({ "content": SLOW })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    response
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = call_json(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["storage"], "connected");
}

#[tokio::test]
async fn test_authentication() {
    let (app, _) = app();

    let (status, _) = call_json(&app, Method::POST, "/threads", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Anonymous listing is empty, not an error
    let (status, body) = call_json(&app, Method::GET, "/threads", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["threads"].as_array().unwrap().is_empty());

    let (status, _) = call(
        &app,
        Method::GET,
        "/threads",
        None,
        &[("Authorization", "Bearer not-a-jwt")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_thread_crud() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;

    let (status, body) =
        call_json(&app, Method::GET, &format!("/threads/{}", thread_id), Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "New Chat");

    let (status, body) = call_json(
        &app,
        Method::PATCH,
        &format!("/threads/{}", thread_id),
        Some("alice"),
        Some(json!({ "title": "Trip planning" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Trip planning");

    let (_, body) = call_json(&app, Method::GET, "/threads?q=trip", Some("alice"), None).await;
    assert_eq!(body["threads"].as_array().unwrap().len(), 1);

    let (status, _) =
        call_json(&app, Method::DELETE, &format!("/threads/{}", thread_id), Some("alice"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call_json(&app, Method::GET, "/threads", Some("alice"), None).await;
    assert!(body["threads"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_foreign_thread_forbidden() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;

    for (method, uri) in [
        (Method::GET, format!("/threads/{}", thread_id)),
        (Method::GET, format!("/threads/{}/messages", thread_id)),
        (Method::GET, format!("/threads/{}/summaries", thread_id)),
        (Method::POST, format!("/threads/{}/stop", thread_id)),
        (Method::DELETE, format!("/threads/{}", thread_id)),
    ] {
        let (status, body) = call_json(&app, method, &uri, Some("bob"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert!(body["error"].is_string());
    }

    let (status, _) = send(&app, "bob", &thread_id, "Hi").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(messages(&app, "alice", &thread_id).await.is_empty());

    // Unknown thread ids look exactly like foreign ones
    let (status, _) = call_json(&app, Method::GET, "/threads/missing", Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_send_streams_and_persists() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;

    let (status, body) = send(&app, "alice", &thread_id, "Hi").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("event: reasoning"));
    assert!(body.contains("event: message"));
    assert!(body.contains("event: done"));

    let messages = messages(&app, "alice", &thread_id).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "Hi");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Hello!");
    assert_eq!(messages[1]["parts"][0]["type"], "reasoning");
    assert_eq!(messages[1]["parts"][0]["reasoning"], "thinking");
    assert_eq!(messages[1]["parts"][1]["type"], "text");

    let assistant_id = messages[1]["message_id"].as_str().unwrap();
    assert!(body.contains(assistant_id));
}

#[tokio::test]
async fn test_first_message_names_thread() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;

    let mut title = String::new();
    for _ in 0..50 {
        let (_, body) =
            call_json(&app, Method::GET, &format!("/threads/{}", thread_id), Some("alice"), None)
                .await;
        title = body["title"].as_str().unwrap().to_string();
        if title != "New Chat" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(title, "Greeting");

    let (_, body) = call_json(
        &app,
        Method::GET,
        &format!("/threads/{}/summaries", thread_id),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["summaries"][0]["content"], "Greeting");
}

#[tokio::test]
async fn test_missing_provider_key_rejected_without_side_effects() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages", thread_id),
        Some("alice"),
        &[GOOGLE_KEY],
        Some(json!({ "content": "Hi", "model": "GPT-4o" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("X-OpenAI-API-Key"));

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages", thread_id),
        Some("alice"),
        &[GOOGLE_KEY],
        Some(json!({ "content": "Hi", "model": "no-such-model" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(messages(&app, "alice", &thread_id).await.is_empty());
}

#[tokio::test]
async fn test_edit_replaces_trailing_messages() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;
    send(&app, "alice", &thread_id, "How are you?").await;

    let before = messages(&app, "alice", &thread_id).await;
    assert_eq!(before.len(), 4);
    let second_user = before[2]["message_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/edit", thread_id, second_user),
        Some("alice"),
        &[GOOGLE_KEY],
        Some(json!({ "content": "How old are you?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("event: done"));

    let after = messages(&app, "alice", &thread_id).await;
    assert_eq!(after.len(), 4);
    assert_eq!(after[0]["message_id"], before[0]["message_id"]);
    assert_eq!(after[1]["message_id"], before[1]["message_id"]);
    assert_eq!(after[2]["content"], "How old are you?");
    assert_ne!(after[2]["message_id"], before[2]["message_id"]);
    assert_eq!(after[3]["role"], "assistant");
    assert_ne!(after[3]["message_id"], before[3]["message_id"]);
}

#[tokio::test]
async fn test_edit_rejects_assistant_message() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;
    let assistant = messages(&app, "alice", &thread_id).await[1]["message_id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/edit", thread_id, assistant),
        Some("alice"),
        &[GOOGLE_KEY],
        Some(json!({ "content": "Changed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(messages(&app, "alice", &thread_id).await.len(), 2);
}

#[tokio::test]
async fn test_regenerate_assistant_reply() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;
    let before = messages(&app, "alice", &thread_id).await;
    let assistant = before[1]["message_id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/regenerate", thread_id, assistant),
        Some("alice"),
        &[GOOGLE_KEY],
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let after = messages(&app, "alice", &thread_id).await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0]["message_id"], before[0]["message_id"]);
    assert_ne!(after[1]["message_id"], before[1]["message_id"]);
    assert_eq!(after[1]["content"], "Hello!");
}

#[tokio::test]
async fn test_regenerate_from_user_message() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;
    assert_eq!(wait_for_summaries(&app, "alice", &thread_id, 1).await.len(), 1);
    let before = messages(&app, "alice", &thread_id).await;
    let user = before[0]["message_id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/regenerate", thread_id, user),
        Some("alice"),
        &[GOOGLE_KEY],
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let after = messages(&app, "alice", &thread_id).await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0]["content"], "Hi");
    assert_ne!(after[0]["message_id"], before[0]["message_id"]);
    assert_eq!(after[1]["role"], "assistant");

    // The old summary went with the old row; the re-inserted message gets its own
    let reinserted = after[0]["message_id"].clone();
    let mut summarized = false;
    for _ in 0..50 {
        let found = summaries(&app, "alice", &thread_id).await;
        if found.iter().any(|s| s["message_id"] == reinserted) {
            assert_eq!(found.len(), 1);
            summarized = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(summarized);
}

#[tokio::test]
async fn test_every_user_message_is_summarized() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;
    send(&app, "alice", &thread_id, "Again").await;

    let found = wait_for_summaries(&app, "alice", &thread_id, 2).await;
    assert_eq!(found.len(), 2);

    let sent = messages(&app, "alice", &thread_id).await;
    let second_user = &sent[2]["message_id"];
    assert!(found.iter().any(|s| &s["message_id"] == second_user));
    assert!(found.iter().any(|s| s["message_id"] == sent[0]["message_id"]));
}

#[tokio::test]
async fn test_edit_while_streaming_cuts_old_reply() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    let pending = send_slow(&app, "alice", &thread_id).await;
    let slow_id = messages(&app, "alice", &thread_id).await[0]["message_id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/edit", thread_id, slow_id),
        Some("alice"),
        &[GOOGLE_KEY],
        Some(json!({ "content": "Edited" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("event: done"));

    let cut = read_body(pending).await;
    assert!(cut.contains("event: stopped"));
    assert!(!cut.contains("LATE"));

    let after = messages(&app, "alice", &thread_id).await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0]["role"], "user");
    assert_eq!(after[0]["content"], "Edited");
    assert_eq!(after[1]["role"], "assistant");
    assert_eq!(after[1]["content"], "Hello!");
}

#[tokio::test]
async fn test_stop_route_ends_stream() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    let pending = send_slow(&app, "alice", &thread_id).await;

    let (status, body) = call_json(
        &app,
        Method::POST,
        &format!("/threads/{}/stop", thread_id),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], true);

    let cut = read_body(pending).await;
    assert!(cut.contains("event: stopped"));
    assert!(!cut.contains("event: done"));

    let after = messages(&app, "alice", &thread_id).await;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0]["content"], SLOW);
}

#[tokio::test]
async fn test_delete_all_threads_stops_generations() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    let pending = send_slow(&app, "alice", &thread_id).await;

    let (status, body) = call_json(&app, Method::DELETE, "/threads", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);

    let cut = read_body(pending).await;
    assert!(cut.contains("event: stopped"));
    assert!(!cut.contains("LATE"));
}

#[tokio::test]
async fn test_rewrites_require_google_key() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;
    let before = messages(&app, "alice", &thread_id).await;
    let user = before[0]["message_id"].as_str().unwrap().to_string();

    // The chosen model's own key is present, but edits and regenerations are
    // summarized with Google
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/edit", thread_id, user),
        Some("alice"),
        &[OPENAI_KEY],
        Some(json!({ "content": "Changed", "model": "GPT-4o" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("X-Google-API-Key"));

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/regenerate", thread_id, user),
        Some("alice"),
        &[OPENAI_KEY],
        Some(json!({ "model": "GPT-4o" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(messages(&app, "alice", &thread_id).await, before);
}

#[tokio::test]
async fn test_configured_options_reach_the_model() {
    let (app, _, requests) = app_with(test_config_with("max_tokens = 512"));
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;

    let requests = requests.lock().unwrap();
    let reply = requests.iter().find(|r| r.model != SUMMARY_MODEL).unwrap();
    assert_eq!(reply.options.max_tokens, Some(512));
    assert_eq!(reply.options.temperature, None);
}

#[tokio::test]
async fn test_trailing_deletion_route() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    send(&app, "alice", &thread_id, "Hi").await;
    send(&app, "alice", &thread_id, "Again").await;
    let before = messages(&app, "alice", &thread_id).await;
    let cut = before[2]["message_id"].as_str().unwrap().to_string();

    let (status, body) = call_json(
        &app,
        Method::DELETE,
        &format!("/threads/{}/messages/{}/trailing", thread_id, cut),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"].as_array().unwrap().len(), 2);
    assert_eq!(messages(&app, "alice", &thread_id).await.len(), 2);

    // The cut point is gone now
    let (status, _) = call_json(
        &app,
        Method::DELETE,
        &format!("/threads/{}/messages/{}/trailing", thread_id, cut),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_append_and_delete_message() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;

    let (status, body) = call_json(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/append", thread_id),
        Some("alice"),
        Some(json!({ "role": "system", "content": "Be brief" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let message_id = body["message_id"].as_str().unwrap().to_string();

    let (status, _) = call_json(
        &app,
        Method::DELETE,
        &format!("/threads/{}/messages/{}", thread_id, message_id),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(messages(&app, "alice", &thread_id).await.is_empty());
}

#[tokio::test]
async fn test_summaries_routes() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;
    let (_, body) = call_json(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/append", thread_id),
        Some("alice"),
        Some(json!({ "role": "user", "content": "Plan a trip" })),
    )
    .await;
    let message_id = body["message_id"].as_str().unwrap().to_string();

    let (status, body) = call_json(
        &app,
        Method::POST,
        &format!("/threads/{}/summaries", thread_id),
        Some("alice"),
        Some(json!({ "message_id": message_id, "content": "Trip" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "Trip");

    let (status, _) = call_json(
        &app,
        Method::POST,
        &format!("/threads/{}/summaries", thread_id),
        Some("alice"),
        Some(json!({ "message_id": "missing", "content": "Trip" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Triggering needs the Google key
    let (status, _) = call_json(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/summary", thread_id, message_id),
        Some("alice"),
        Some(json!({ "is_title": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/threads/{}/messages/{}/summary", thread_id, message_id),
        Some("alice"),
        &[GOOGLE_KEY],
        Some(json!({ "is_title": true })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_stop_without_generation() {
    let (app, _) = app();
    let thread_id = create_thread(&app, "alice").await;

    let (status, body) = call_json(
        &app,
        Method::POST,
        &format!("/threads/{}/stop", thread_id),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], false);
}

#[tokio::test]
async fn test_delete_all_threads_only_touches_caller() {
    let (app, store) = app();
    create_thread(&app, "alice").await;
    create_thread(&app, "alice").await;
    let bobs = create_thread(&app, "bob").await;

    let (status, body) = call_json(&app, Method::DELETE, "/threads", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    let bob = threadline_persist::Identity::new("bob");
    assert!(store.get_thread(Some(&bob), &bobs).await.is_ok());
}

#[tokio::test]
async fn test_openapi_document() {
    let (app, _) = app();
    let (status, body) = call_json(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/threads/{thread_id}/messages"].is_object());
    assert!(body["paths"]["/threads/{thread_id}/messages/{message_id}/trailing"].is_object());
}

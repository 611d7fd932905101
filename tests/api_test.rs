//! HTTP API tests driven through the router without a listener.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bot_ai::chat::{BackendKind, ChatConfig};
use bot_ai::server::{AppState, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> (Router, Arc<AppState>) {
    app_with_delay(20)
}

fn app_with_delay(typing_delay_ms: u64) -> (Router, Arc<AppState>) {
    let mut config = ChatConfig::default();
    config.storage.backend = BackendKind::Memory;
    config.session.typing_delay_ms = typing_delay_ms;
    let state = AppState::new(config).unwrap();
    (create_router(Arc::clone(&state)), state)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = app();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn send_then_reply_appears_in_active_conversation() {
    let (app, _) = app();

    let (status, body) = call(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "content": "Can you explain RESTful APIs?" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"]["isUser"], true);
    let id = body["conversationId"].as_str().unwrap().to_string();

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let (status, active) = call(&app, "GET", "/api/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["id"], id.as_str());
    assert_eq!(active["messages"].as_array().unwrap().len(), 2);
    assert_eq!(active["messages"][1]["isUser"], false);
    assert!(active["messages"][1]["reaction"].is_null());

    let (status, list) = call(&app, "GET", "/api/conversations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["messageCount"], 2);
    assert_eq!(list[0]["title"], "Can you explain REST...");
}

#[tokio::test]
async fn blank_message_is_bad_request() {
    let (app, _) = app();
    let (status, _) = call(&app, "POST", "/api/messages", Some(json!({ "content": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn conversation_lifecycle() {
    let (app, _) = app();

    let (status, created) = call(&app, "POST", "/api/conversations", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "New Chat");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        "PUT",
        &format!("/api/conversations/{id}/feedback"),
        Some(json!({ "rating": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rated) = call(
        &app,
        "PUT",
        &format!("/api/conversations/{id}/feedback"),
        Some(json!({ "rating": 4, "feedback": "Nice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rated["rating"], 4);

    let (_, filtered) = call(&app, "GET", "/api/conversations?rating=4", None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    let (_, none) = call(&app, "GET", "/api/conversations?rating=2", None).await;
    assert!(none.as_array().unwrap().is_empty());

    let (status, _) = call(&app, "DELETE", &format!("/api/conversations/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &format!("/api/conversations/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "DELETE", &format!("/api/conversations/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reaction_endpoint_sets_and_clears() {
    let (app, state) = app();
    state.chat.create_conversation().await.unwrap();
    let message = state.chat.add_ai_response("What is a JWT and how is it used?").await.unwrap();
    let id = state.chat.active_id().await.unwrap();
    let uri = format!("/api/conversations/{id}/messages/{}/reaction", message.id);

    let (status, _) = call(&app, "PUT", &uri, Some(json!({ "reaction": "like" }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, loaded) = call(&app, "GET", &format!("/api/conversations/{id}"), None).await;
    assert_eq!(loaded["messages"][0]["reaction"], "like");

    let (status, _) = call(&app, "PUT", &uri, Some(json!({ "reaction": null }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, loaded) = call(&app, "GET", &format!("/api/conversations/{id}"), None).await;
    assert!(loaded["messages"][0]["reaction"].is_null());

    let unknown = format!(
        "/api/conversations/{id}/messages/{}/reaction",
        uuid::Uuid::new_v4()
    );
    let (status, _) = call(&app, "PUT", &unknown, Some(json!({ "reaction": "dislike" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_reply_can_be_cancelled() {
    let (app, state) = app_with_delay(5_000);
    let (status, body) = call(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "content": "What is Docker?" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["conversationId"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "content": "Hello again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/conversations/{id}/reply");
    let (status, _) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "content": "Hello again" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(state.chat.shutdown(), 1);
}

#[tokio::test]
async fn active_conversation_direct_appends() {
    let (app, _) = app();

    let (status, _) = call(
        &app,
        "POST",
        "/api/active/messages",
        Some(json!({ "content": "hi", "isUser": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    call(&app, "POST", "/api/conversations", None).await;
    let (status, message) = call(
        &app,
        "POST",
        "/api/active/messages",
        Some(json!({ "content": "What is a closure?", "isUser": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["isUser"], true);

    let (status, reply) = call(
        &app,
        "POST",
        "/api/active/ai-response",
        Some(json!({ "message": "what time is it" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["isUser"], false);
    assert_eq!(reply["content"], "Sorry, Did not understand your query!");

    let (_, active) = call(&app, "GET", "/api/active", None).await;
    assert_eq!(active["messages"].as_array().unwrap().len(), 2);
    assert_eq!(active["title"], "What is a closure?");

    let (status, _) = call(&app, "DELETE", "/api/active", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, active) = call(&app, "GET", "/api/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(active.is_null());
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
    let (app, _) = app();
    let (status, _) = call(&app, "GET", "/api/conversations/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn respond_and_suggestions() {
    let (app, _) = app();

    let (status, body) = call(
        &app,
        "POST",
        "/api/respond",
        Some(json!({ "message": "what time is it" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "fallback");
    assert_eq!(body["response"], "Sorry, Did not understand your query!");

    let (status, suggestions) = call(&app, "GET", "/api/suggestions", None).await;
    assert_eq!(status, StatusCode::OK);
    let suggestions = suggestions.as_array().unwrap();
    assert_eq!(suggestions.len(), 4);
    assert_eq!(
        suggestions[0]["description"],
        "Get immediate AI generated response"
    );
}

//! HTTP route handlers for the chat API.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::clock::format_date;
use crate::chat::core::conversation::{Conversation, Message, Reaction};
use crate::chat::core::errors::ChatError;
use crate::chat::core::ids::{ConversationId, MessageId};
use crate::chat::matching::matcher::MatchKind;
use crate::chat::matching::suggestions::Suggestion;

use super::state::AppState;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Create the API router with all routes.
#[must_use]
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(load_conversation).delete(delete_conversation),
        )
        .route("/api/conversations/{id}/feedback", put(save_feedback))
        .route("/api/conversations/{id}/reply", delete(cancel_reply))
        .route(
            "/api/conversations/{id}/messages/{message_id}/reaction",
            put(set_reaction),
        )
        .route("/api/active", get(active_conversation).delete(clear_active))
        .route("/api/active/messages", post(add_message))
        .route("/api/active/ai-response", post(add_ai_response))
        .route("/api/messages", post(send_message))
        .route("/api/suggestions", get(suggestions))
        .route("/api/respond", post(preview_response))
        .with_state(state)
}

/// Map a chat error to an HTTP status and message.
fn api_error(err: ChatError) -> (StatusCode, String) {
    let status = match &err {
        ChatError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::EmptyMessage | ChatError::InvalidRating(_) | ChatError::InvalidId(_) => {
            StatusCode::BAD_REQUEST
        }
        ChatError::NoActiveConversation | ChatError::ReplyPending(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(%err, "Request failed");
    }
    (status, err.to_string())
}

fn not_found(id: ConversationId) -> (StatusCode, String) {
    api_error(ChatError::ConversationNotFound(id))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "bot-ai",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Rating filter for the history list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only conversations with this rating.
    pub rating: Option<u8>,
}

/// History list entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: ConversationId,
    /// Title.
    pub title: String,
    /// Number of messages.
    pub message_count: usize,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Human-readable last update date.
    pub display_date: String,
    /// Optional rating.
    pub rating: Option<u8>,
    /// Optional feedback.
    pub feedback: Option<String>,
}

impl From<Conversation> for ConversationSummary {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            title: c.title,
            message_count: c.messages.len(),
            created_at: c.created_at,
            updated_at: c.updated_at,
            display_date: format_date(&c.updated_at),
            rating: c.rating,
            feedback: c.feedback,
        }
    }
}

async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let conversations = state
        .chat
        .list_conversations(query.rating)
        .await
        .map_err(api_error)?;
    Ok(Json(
        conversations
            .into_iter()
            .map(ConversationSummary::from)
            .collect(),
    ))
}

async fn create_conversation(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let conversation = state.chat.create_conversation().await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

async fn load_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> ApiResult<Json<Conversation>> {
    state
        .chat
        .load_conversation(id)
        .await
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> ApiResult<StatusCode> {
    if state.chat.delete_conversation(id).await.map_err(api_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// Feedback form submission.
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    /// Rating from 1 to 5.
    pub rating: Option<u8>,
    /// Free-text feedback.
    pub feedback: Option<String>,
}

async fn save_feedback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<Json<Conversation>> {
    state
        .chat
        .save_feedback(id, request.rating, request.feedback)
        .await
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// Reaction update; `null` clears the reaction.
#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    /// New reaction.
    pub reaction: Option<Reaction>,
}

async fn set_reaction(
    State(state): State<Arc<AppState>>,
    Path((id, message_id)): Path<(ConversationId, MessageId)>,
    Json(request): Json<ReactionRequest>,
) -> ApiResult<StatusCode> {
    let applied = state
        .chat
        .set_reaction(id, message_id, request.reaction)
        .await
        .map_err(api_error)?;
    if applied {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("message {message_id} not found in conversation {id}"),
        ))
    }
}

async fn active_conversation(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Option<Conversation>>> {
    let conversation = state.chat.active_conversation().await.map_err(api_error)?;
    Ok(Json(conversation))
}

async fn clear_active(State(state): State<Arc<AppState>>) -> StatusCode {
    state.chat.clear_active().await;
    StatusCode::NO_CONTENT
}

async fn cancel_reply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> ApiResult<StatusCode> {
    if state.chat.cancel_pending_reply(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("no reply pending for conversation {id}"),
        ))
    }
}

/// Message appended directly to the active conversation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageRequest {
    /// Message text.
    pub content: String,
    /// Whether the user wrote it.
    pub is_user: bool,
}

async fn add_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state
        .chat
        .add_message(&request.content, request.is_user)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn add_ai_response(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RespondRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state
        .chat
        .add_ai_response(&request.message)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Message sent from the chat input.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// Message text.
    pub content: String,
}

/// Accepted user message; the reply follows after the typing pause.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    /// Conversation the message was appended to.
    pub conversation_id: ConversationId,
    /// The stored user message.
    pub message: Message,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> ApiResult<(StatusCode, Json<SendResponse>)> {
    let (conversation_id, message) = state
        .chat
        .send_message(&request.content)
        .await
        .map_err(api_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SendResponse {
            conversation_id,
            message,
        }),
    ))
}

async fn suggestions(State(state): State<Arc<AppState>>) -> Json<Vec<Suggestion>> {
    Json(state.chat.suggestions())
}

/// Matcher preview request.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    /// Text to match.
    pub message: String,
}

/// Matcher preview response.
#[derive(Debug, Serialize)]
pub struct RespondResponse {
    /// Canned response.
    pub response: String,
    /// Pass that matched.
    pub kind: MatchKind,
}

async fn preview_response(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RespondRequest>,
) -> Json<RespondResponse> {
    let outcome = state.chat.preview_response(&request.message);
    Json(RespondResponse {
        response: outcome.response.to_string(),
        kind: outcome.kind,
    })
}

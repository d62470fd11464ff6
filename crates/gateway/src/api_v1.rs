//! HTTP API v1 — the authenticated REST surface of the agent.
//!
//! Endpoints:
//!
//! - `POST   /v1/chat`               — Send a message, get the agent's reply
//! - `GET    /v1/conversations`      — List the caller's conversations
//! - `GET    /v1/conversations/{id}` — One conversation with its messages
//! - `DELETE /v1/conversations/{id}` — Delete a conversation and its messages
//! - `GET    /v1/tools`              — The task tools exposed to the model
//!
//! Every route requires a bearer token; the auth middleware in the crate
//! root resolves it to the calling user before any handler runs.

use axum::{
    Extension, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use taskling_agent::TurnRequest;
use taskling_core::Error;
use taskling_core::conversation::{ConversationId, Role, StoredMessage, ToolCallRecord};

use crate::{AuthedUser, SharedState};

/// Messages returned by the conversation detail endpoint.
const DETAIL_MESSAGE_LIMIT: usize = 1_000;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/conversations", get(list_conversations_handler))
        .route(
            "/conversations/{id}",
            get(get_conversation_handler).delete(delete_conversation_handler),
        )
        .route("/tools", get(list_tools_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    /// Existing conversation id (omit to start a new conversation).
    #[serde(default)]
    conversation_id: Option<String>,
    /// The user's message.
    message: String,
    /// Client-generated idempotency key for safe retries.
    #[serde(default)]
    client_message_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ChatResponse {
    conversation_id: String,
    reply: String,
}

#[derive(Serialize, Deserialize)]
struct ConversationListResponse {
    conversations: Vec<ConversationSummaryDto>,
}

#[derive(Serialize, Deserialize)]
struct ConversationSummaryDto {
    id: String,
    title: Option<String>,
    created_at: String,
}

#[derive(Serialize, Deserialize)]
struct ConversationDetailResponse {
    id: String,
    title: Option<String>,
    created_at: String,
    messages: Vec<MessageDto>,
}

#[derive(Serialize, Deserialize)]
struct MessageDto {
    seq: i64,
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call: Option<ToolCallRecord>,
    timestamp: String,
}

#[derive(Serialize, Deserialize)]
struct DeleteConversationResponse {
    deleted: bool,
}

#[derive(Serialize, Deserialize)]
struct ToolListResponse {
    tools: Vec<ToolDto>,
    count: usize,
}

#[derive(Serialize, Deserialize)]
struct ToolDto {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// The error body every failing route answers with.
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code ("validation", "not_found", ...).
    pub error: String,
    /// Human-readable explanation.
    pub message: String,
}

/// Map a domain error onto an HTTP status and a structured body.
///
/// Model failures collapse to a generic 502 so upstream detail never
/// reaches the client; the real error goes to the log instead.
pub(crate) fn error_response(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code, message) = match &err {
        Error::Validation(m) => (StatusCode::BAD_REQUEST, "validation", m.clone()),
        Error::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
        Error::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.clone()),
        Error::Model(e) => {
            error!(error = %e, "Model call failed");
            (
                StatusCode::BAD_GATEWAY,
                "model_unavailable",
                "The language model is temporarily unavailable. Please try again.".to_string(),
            )
        }
        other => {
            error!(error = %other, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Internal server error".to_string(),
            )
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: code.into(),
            message,
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Extension(AuthedUser(caller)): Extension<AuthedUser>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(caller = %caller, "v1/chat request");

    let request = TurnRequest {
        conversation_id: payload.conversation_id.as_deref().map(ConversationId::from),
        message: payload.message,
        client_message_id: payload.client_message_id,
    };

    let reply = state
        .orchestrator
        .handle_turn(&caller, request)
        .await
        .map_err(error_response)?;

    Ok(Json(ChatResponse {
        conversation_id: reply.conversation_id.to_string(),
        reply: reply.reply,
    }))
}

async fn list_conversations_handler(
    State(state): State<SharedState>,
    Extension(AuthedUser(caller)): Extension<AuthedUser>,
) -> Result<Json<ConversationListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let conversations = state
        .conversations
        .list(&caller)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(ConversationListResponse {
        conversations: conversations
            .iter()
            .map(|c| ConversationSummaryDto {
                id: c.id.to_string(),
                title: c.title.clone(),
                created_at: c.created_at.to_rfc3339(),
            })
            .collect(),
    }))
}

async fn get_conversation_handler(
    State(state): State<SharedState>,
    Extension(AuthedUser(caller)): Extension<AuthedUser>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetailResponse>, (StatusCode, Json<ErrorResponse>)> {
    let id = ConversationId::from(&id);

    // Ownership gate, same rules as the chat path.
    let conversation = state
        .orchestrator
        .loader()
        .authorize(&id, &caller)
        .await
        .map_err(error_response)?;

    let messages = state
        .conversations
        .messages(&id, DETAIL_MESSAGE_LIMIT)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(ConversationDetailResponse {
        id: conversation.id.to_string(),
        title: conversation.title,
        created_at: conversation.created_at.to_rfc3339(),
        messages: messages.into_iter().map(message_dto).collect(),
    }))
}

async fn delete_conversation_handler(
    State(state): State<SharedState>,
    Extension(AuthedUser(caller)): Extension<AuthedUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteConversationResponse>, (StatusCode, Json<ErrorResponse>)> {
    let id = ConversationId::from(&id);

    state
        .orchestrator
        .loader()
        .authorize(&id, &caller)
        .await
        .map_err(error_response)?;

    // Messages cascade with the conversation in every backend.
    let deleted = state
        .conversations
        .delete(&id)
        .await
        .map_err(|e| error_response(e.into()))?;

    info!(conversation_id = %id, caller = %caller, "Conversation deleted");
    Ok(Json(DeleteConversationResponse { deleted }))
}

async fn list_tools_handler() -> Json<ToolListResponse> {
    let defs = taskling_tools::definitions();
    let count = defs.len();

    Json(ToolListResponse {
        tools: defs
            .into_iter()
            .map(|d| ToolDto {
                name: d.name,
                description: d.description,
                parameters: d.parameters,
            })
            .collect(),
        count,
    })
}

fn message_dto(m: StoredMessage) -> MessageDto {
    MessageDto {
        seq: m.seq,
        role: m.role,
        content: m.content,
        tool_call: m.tool_call,
        timestamp: m.timestamp.to_rfc3339(),
    }
}

//! Conversation and turn-record domain types.
//!
//! These are the value objects the chat pipeline persists: a conversation
//! shell plus an append-only log of messages. One user turn produces a
//! `user` row, zero or more `tool` rows, and an `assistant` row, in that
//! order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::UserId;
use crate::tool::ToolOutcome;

/// Characters kept when deriving a conversation title from its first message.
const TITLE_MAX_CHARS: usize = 60;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a message.
///
/// `System` exists only on the wire; the system prompt is rebuilt every turn
/// and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model's reply
    Assistant,
    /// System instructions (wire-only)
    System,
    /// One executed tool call and its outcome
    Tool,
}

/// One tool invocation within a turn: what the model asked for and what
/// came back. Persisted inside the `tool` row of the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Model-assigned call id, echoed back in the result message
    pub call_id: String,

    /// Which of the task tools was invoked
    pub name: String,

    /// The arguments exactly as validated and executed
    pub arguments: serde_json::Value,

    /// The structured outcome returned to the model
    pub outcome: ToolOutcome,
}

/// A message as persisted in the conversation log.
///
/// Append-only and immutable once written. `seq` is store-assigned and is
/// the canonical ordering; wall-clock timestamps are informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Store-assigned, strictly increasing within a conversation
    pub seq: i64,

    pub conversation_id: ConversationId,

    pub role: Role,

    pub content: String,

    /// Present only on `Role::Tool` rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRecord>,

    /// Client-supplied idempotency key, when the client sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

/// Conversation metadata. The messages live in their own append-only log,
/// keyed by [`ConversationId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    /// The owning user; loading a conversation checks this against the caller
    pub owner_id: UserId,

    /// Derived from the first user message, user-visible in listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation owned by `owner`, titled from its opening message.
    pub fn new(owner: &UserId, first_message: &str) -> Self {
        Self {
            id: ConversationId::new(),
            owner_id: owner.clone(),
            title: derive_title(first_message),
            created_at: Utc::now(),
        }
    }
}

/// Derives a short title from the first user message.
///
/// Truncation counts chars, not bytes, so multibyte input stays valid.
pub fn derive_title(message: &str) -> Option<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(TITLE_MAX_CHARS).collect())
}

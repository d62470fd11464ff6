//! Storage traits for tasks and conversations.
//!
//! Backends live in `taskling-store`: SQLite (default), Postgres, in-memory.
//! Task operations are scoped by the owning user at this boundary — a task
//! belonging to someone else is reported exactly like a missing one.
//! Conversation ownership is a policy question and is enforced one layer up,
//! in the context loader and the gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, ConversationId, Role, StoredMessage, ToolCallRecord};
use crate::error::StoreError;
use crate::task::{Priority, Task, UserId};

/// Fields for creating a task. The owner comes from the call, never the payload.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

/// A partial task update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.priority.is_none()
    }
}

/// Completion-state filter for task listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Pending,
    Completed,
    #[default]
    All,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StatusFilter::Pending),
            "completed" => Some(StatusFilter::Completed),
            "all" => Some(StatusFilter::All),
            _ => None,
        }
    }
}

/// Task persistence, always scoped by owner.
///
/// `get`/`update`/`complete` return `None` and `delete` returns `false` when
/// the task does not exist *for this owner*; foreign tasks are never
/// distinguished from missing ones.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(
        &self,
        owner: &UserId,
        task: NewTask,
    ) -> std::result::Result<Task, StoreError>;

    /// All of `owner`'s tasks in creation order, optionally filtered.
    async fn list(
        &self,
        owner: &UserId,
        filter: StatusFilter,
    ) -> std::result::Result<Vec<Task>, StoreError>;

    async fn get(
        &self,
        owner: &UserId,
        id: i64,
    ) -> std::result::Result<Option<Task>, StoreError>;

    /// Applies `patch` and returns the updated task.
    async fn update(
        &self,
        owner: &UserId,
        id: i64,
        patch: TaskPatch,
    ) -> std::result::Result<Option<Task>, StoreError>;

    /// Marks the task complete. Idempotent: completing a completed task
    /// succeeds and returns it unchanged.
    async fn complete(
        &self,
        owner: &UserId,
        id: i64,
    ) -> std::result::Result<Option<Task>, StoreError>;

    /// Hard delete. `true` when a row was removed.
    async fn delete(
        &self,
        owner: &UserId,
        id: i64,
    ) -> std::result::Result<bool, StoreError>;
}

/// Fields for appending one message to a conversation log.
///
/// `seq` and the timestamp are store-assigned on insert.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub tool_call: Option<ToolCallRecord>,
    pub client_message_id: Option<String>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call: None,
            client_message_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call: None,
            client_message_id: None,
        }
    }

    /// A tool row. The content is the outcome payload the model saw.
    pub fn tool(record: ToolCallRecord) -> Self {
        Self {
            role: Role::Tool,
            content: record.outcome.to_model_payload(),
            tool_call: Some(record),
            client_message_id: None,
        }
    }

    pub fn with_client_message_id(mut self, id: impl Into<String>) -> Self {
        self.client_message_id = Some(id.into());
        self
    }
}

/// Conversation persistence: shells plus append-only message logs.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a new conversation shell.
    async fn create(
        &self,
        conversation: &Conversation,
    ) -> std::result::Result<(), StoreError>;

    async fn get(
        &self,
        id: &ConversationId,
    ) -> std::result::Result<Option<Conversation>, StoreError>;

    /// All conversations owned by `owner`, newest first.
    async fn list(
        &self,
        owner: &UserId,
    ) -> std::result::Result<Vec<Conversation>, StoreError>;

    /// Deletes the conversation and all its messages. `true` when it existed.
    async fn delete(
        &self,
        id: &ConversationId,
    ) -> std::result::Result<bool, StoreError>;

    /// Appends one message and returns it with `seq` assigned.
    async fn append(
        &self,
        id: &ConversationId,
        message: NewMessage,
    ) -> std::result::Result<StoredMessage, StoreError>;

    /// The `limit` most recent messages, in ascending `seq` order.
    async fn messages(
        &self,
        id: &ConversationId,
        limit: usize,
    ) -> std::result::Result<Vec<StoredMessage>, StoreError>;

    /// Looks up a user message by its client-supplied idempotency key.
    async fn find_client_message(
        &self,
        id: &ConversationId,
        client_message_id: &str,
    ) -> std::result::Result<Option<StoredMessage>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolOutcome;

    #[test]
    fn empty_patch_is_detected() {
        assert!(TaskPatch::default().is_empty());
        let patch = TaskPatch {
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn status_filter_parses_lowercase() {
        let filter: StatusFilter = serde_json::from_str(r#""pending""#).unwrap();
        assert_eq!(filter, StatusFilter::Pending);
        assert_eq!(StatusFilter::default(), StatusFilter::All);
    }

    #[test]
    fn tool_message_content_is_outcome_payload() {
        let record = ToolCallRecord {
            call_id: "call_1".into(),
            name: "list_tasks".into(),
            arguments: serde_json::json!({}),
            outcome: ToolOutcome::ok(serde_json::json!({"tasks": []})),
        };
        let msg = NewMessage::tool(record);
        assert_eq!(msg.role, Role::Tool);
        assert!(msg.content.contains(r#""success":true"#));
    }
}

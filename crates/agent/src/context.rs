//! Context loading — fresh, bounded reads of conversation history.
//!
//! Every turn re-reads the conversation store. There is no cache and no
//! TTL: the result reflects everything committed before the call, which is
//! what lets any process instance serve any conversation without session
//! affinity.

use std::sync::Arc;

use taskling_core::conversation::{Conversation, ConversationId, Role, StoredMessage};
use taskling_core::error::{Error, Result};
use taskling_core::model::{ChatMessage, ToolCallRequest};
use taskling_core::store::ConversationStore;
use taskling_core::task::UserId;

/// Loads conversation context on behalf of an authenticated caller.
pub struct ContextLoader {
    conversations: Arc<dyn ConversationStore>,
}

impl ContextLoader {
    pub fn new(conversations: Arc<dyn ConversationStore>) -> Self {
        Self { conversations }
    }

    /// The ownership gate: the conversation must exist and belong to
    /// `caller`.
    ///
    /// A missing conversation is `NotFound`; someone else's conversation is
    /// `Forbidden`. Unlike task ids, conversation ids are unguessable, so
    /// these errors are not masked.
    pub async fn authorize(
        &self,
        id: &ConversationId,
        caller: &UserId,
    ) -> Result<Conversation> {
        let conversation = self
            .conversations
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("conversation {id} not found")))?;

        if conversation.owner_id != *caller {
            return Err(Error::Forbidden(format!(
                "conversation {id} does not belong to the caller"
            )));
        }

        Ok(conversation)
    }

    /// The most recent `limit` messages, ascending `seq` order.
    ///
    /// `None` means a conversation that does not exist yet: empty history.
    /// A supplied id goes through [`Self::authorize`] first, so no read
    /// happens on a conversation the caller does not own.
    pub async fn load(
        &self,
        id: Option<&ConversationId>,
        caller: &UserId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>> {
        let Some(id) = id else {
            return Ok(Vec::new());
        };

        self.authorize(id, caller).await?;
        Ok(self.conversations.messages(id, limit).await?)
    }

    /// Render stored history into the wire messages the model expects.
    ///
    /// `user` and `assistant` rows map one-to-one. A run of `tool` rows
    /// becomes one assistant message carrying the calls followed by one
    /// tool-result message per call, which is the shape the chat-completions
    /// protocol requires for replayed tool use.
    pub fn to_model_messages(history: &[StoredMessage]) -> Vec<ChatMessage> {
        let mut wire = Vec::with_capacity(history.len() + 2);
        let mut i = 0;

        while i < history.len() {
            match history[i].role {
                Role::User => {
                    wire.push(ChatMessage::user(history[i].content.clone()));
                    i += 1;
                }
                Role::Assistant => {
                    wire.push(ChatMessage::assistant(history[i].content.clone()));
                    i += 1;
                }
                Role::Tool => {
                    let mut records = Vec::new();
                    while i < history.len() && history[i].role == Role::Tool {
                        // A tool row without its record is a storage anomaly;
                        // the model gets the rows we can still render.
                        if let Some(record) = &history[i].tool_call {
                            records.push(record.clone());
                        }
                        i += 1;
                    }
                    if records.is_empty() {
                        continue;
                    }
                    wire.push(ChatMessage::assistant_tool_calls(
                        records
                            .iter()
                            .map(|r| ToolCallRequest {
                                id: r.call_id.clone(),
                                name: r.name.clone(),
                                arguments: r.arguments.to_string(),
                            })
                            .collect(),
                    ));
                    for record in &records {
                        wire.push(ChatMessage::tool_result(
                            record.call_id.clone(),
                            record.outcome.to_model_payload(),
                        ));
                    }
                }
                // System prompts are rebuilt every turn, never stored.
                Role::System => i += 1,
            }
        }

        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taskling_core::store::NewMessage;
    use taskling_core::tool::ToolOutcome;
    use taskling_core::ToolCallRecord;
    use taskling_store::MemoryStore;

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn stored(seq: i64, role: Role, content: &str) -> StoredMessage {
        StoredMessage {
            seq,
            conversation_id: ConversationId::from("c1"),
            role,
            content: content.into(),
            tool_call: None,
            client_message_id: None,
            timestamp: Utc::now(),
        }
    }

    fn tool_row(seq: i64, call_id: &str, name: &str) -> StoredMessage {
        let record = ToolCallRecord {
            call_id: call_id.into(),
            name: name.into(),
            arguments: serde_json::json!({"title": "buy milk"}),
            outcome: ToolOutcome::ok(serde_json::json!({"id": 1})),
        };
        StoredMessage {
            content: record.outcome.to_model_payload(),
            tool_call: Some(record),
            ..stored(seq, Role::Tool, "")
        }
    }

    #[tokio::test]
    async fn no_conversation_means_empty_history() {
        let store = Arc::new(MemoryStore::new());
        let loader = ContextLoader::new(store);
        let history = loader.load(None, &alice(), 50).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn missing_conversation_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let loader = ContextLoader::new(store);
        let id = ConversationId::from("nope");
        let err = loader.load(Some(&id), &alice(), 50).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn foreign_conversation_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        let conv = Conversation::new(&alice(), "hello");
        ConversationStore::create(store.as_ref(), &conv).await.unwrap();

        let loader = ContextLoader::new(store);
        let err = loader
            .load(Some(&conv.id), &UserId::new("bob"), 50)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn load_returns_the_recent_window_in_order() {
        let store = Arc::new(MemoryStore::new());
        let conv = Conversation::new(&alice(), "hello");
        ConversationStore::create(store.as_ref(), &conv).await.unwrap();
        for i in 0..6 {
            store
                .append(&conv.id, NewMessage::user(format!("msg {i}")))
                .await
                .unwrap();
        }

        let loader = ContextLoader::new(store);
        let history = loader.load(Some(&conv.id), &alice(), 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "msg 3");
        assert_eq!(history[2].content, "msg 5");
        assert!(history[0].seq < history[1].seq && history[1].seq < history[2].seq);
    }

    #[test]
    fn plain_rows_render_one_to_one() {
        let history = vec![
            stored(1, Role::User, "add milk"),
            stored(2, Role::Assistant, "Added."),
        ];
        let wire = ContextLoader::to_model_messages(&history);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, Role::User);
        assert_eq!(wire[1].role, Role::Assistant);
        assert_eq!(wire[1].content, "Added.");
    }

    #[test]
    fn tool_row_expands_into_call_and_result() {
        let history = vec![
            stored(1, Role::User, "add milk"),
            tool_row(2, "call_1", "create_task"),
            stored(3, Role::Assistant, "Done."),
        ];
        let wire = ContextLoader::to_model_messages(&history);
        assert_eq!(wire.len(), 4);

        assert_eq!(wire[1].role, Role::Assistant);
        assert_eq!(wire[1].tool_calls.len(), 1);
        assert_eq!(wire[1].tool_calls[0].name, "create_task");

        assert_eq!(wire[2].role, Role::Tool);
        assert_eq!(wire[2].tool_call_id.as_deref(), Some("call_1"));
        assert!(wire[2].content.contains(r#""success":true"#));
    }

    #[test]
    fn consecutive_tool_rows_share_one_assistant_message() {
        let history = vec![
            tool_row(1, "call_1", "create_task"),
            tool_row(2, "call_2", "list_tasks"),
        ];
        let wire = ContextLoader::to_model_messages(&history);
        // one assistant message with both calls, then two results
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].tool_calls.len(), 2);
        assert_eq!(wire[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(wire[2].tool_call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn tool_row_without_record_is_skipped() {
        let history = vec![stored(1, Role::Tool, "orphan")];
        let wire = ContextLoader::to_model_messages(&history);
        assert!(wire.is_empty());
    }
}

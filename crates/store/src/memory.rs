//! In-memory backend — useful for testing and ephemeral runs.
//!
//! Assigns task ids and message sequence numbers from in-process counters,
//! so ordering semantics match the SQL backends.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use taskling_core::conversation::{Conversation, ConversationId, StoredMessage};
use taskling_core::error::StoreError;
use taskling_core::store::{ConversationStore, NewMessage, NewTask, StatusFilter, TaskPatch, TaskStore};
use taskling_core::task::{Task, UserId};

#[derive(Default)]
struct TaskTable {
    rows: Vec<Task>,
    next_id: i64,
}

#[derive(Default)]
struct MessageTable {
    rows: Vec<StoredMessage>,
    next_seq: i64,
}

/// An in-memory store keeping everything in Vecs behind RwLocks.
pub struct MemoryStore {
    tasks: Arc<RwLock<TaskTable>>,
    conversations: Arc<RwLock<Vec<Conversation>>>,
    messages: Arc<RwLock<MessageTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(TaskTable::default())),
            conversations: Arc::new(RwLock::new(Vec::new())),
            messages: Arc::new(RwLock::new(MessageTable::default())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create(&self, owner: &UserId, task: NewTask) -> Result<Task, StoreError> {
        let mut table = self.tasks.write().await;
        table.next_id += 1;
        let now = Utc::now();
        let created = Task {
            id: table.next_id,
            owner_id: owner.clone(),
            title: task.title,
            description: task.description,
            priority: task.priority,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(created.clone());
        Ok(created)
    }

    async fn list(&self, owner: &UserId, filter: StatusFilter) -> Result<Vec<Task>, StoreError> {
        let table = self.tasks.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|t| &t.owner_id == owner)
            .filter(|t| match filter {
                StatusFilter::All => true,
                StatusFilter::Pending => !t.completed,
                StatusFilter::Completed => t.completed,
            })
            .cloned()
            .collect())
    }

    async fn get(&self, owner: &UserId, id: i64) -> Result<Option<Task>, StoreError> {
        let table = self.tasks.read().await;
        Ok(table
            .rows
            .iter()
            .find(|t| t.id == id && &t.owner_id == owner)
            .cloned())
    }

    async fn update(
        &self,
        owner: &UserId,
        id: i64,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let mut table = self.tasks.write().await;
        let Some(task) = table
            .rows
            .iter_mut()
            .find(|t| t.id == id && &t.owner_id == owner)
        else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn complete(&self, owner: &UserId, id: i64) -> Result<Option<Task>, StoreError> {
        let mut table = self.tasks.write().await;
        let Some(task) = table
            .rows
            .iter_mut()
            .find(|t| t.id == id && &t.owner_id == owner)
        else {
            return Ok(None);
        };

        if !task.completed {
            task.completed = true;
            task.updated_at = Utc::now();
        }
        Ok(Some(task.clone()))
    }

    async fn delete(&self, owner: &UserId, id: i64) -> Result<bool, StoreError> {
        let mut table = self.tasks.write().await;
        let len_before = table.rows.len();
        table.rows.retain(|t| !(t.id == id && &t.owner_id == owner));
        Ok(table.rows.len() < len_before)
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.conversations.write().await.push(conversation.clone());
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.iter().find(|c| &c.id == id).cloned())
    }

    async fn list(&self, owner: &UserId) -> Result<Vec<Conversation>, StoreError> {
        let conversations = self.conversations.read().await;
        let mut mine: Vec<Conversation> = conversations
            .iter()
            .filter(|c| &c.owner_id == owner)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        let len_before = conversations.len();
        conversations.retain(|c| &c.id != id);
        let existed = conversations.len() < len_before;
        drop(conversations);

        if existed {
            self.messages
                .write()
                .await
                .rows
                .retain(|m| &m.conversation_id != id);
        }
        Ok(existed)
    }

    async fn append(
        &self,
        id: &ConversationId,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError> {
        let mut table = self.messages.write().await;
        table.next_seq += 1;
        let stored = StoredMessage {
            seq: table.next_seq,
            conversation_id: id.clone(),
            role: message.role,
            content: message.content,
            tool_call: message.tool_call,
            client_message_id: message.client_message_id,
            timestamp: Utc::now(),
        };
        table.rows.push(stored.clone());
        Ok(stored)
    }

    async fn messages(
        &self,
        id: &ConversationId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let table = self.messages.read().await;
        let mine: Vec<StoredMessage> = table
            .rows
            .iter()
            .filter(|m| &m.conversation_id == id)
            .cloned()
            .collect();
        // Rows are already in seq order; keep the most recent `limit`.
        let skip = mine.len().saturating_sub(limit);
        Ok(mine.into_iter().skip(skip).collect())
    }

    async fn find_client_message(
        &self,
        id: &ConversationId,
        client_message_id: &str,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let table = self.messages.read().await;
        Ok(table
            .rows
            .iter()
            .find(|m| {
                &m.conversation_id == id
                    && m.client_message_id.as_deref() == Some(client_message_id)
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskling_core::task::Priority;

    fn alice() -> UserId {
        UserId::new("alice")
    }

    #[tokio::test]
    async fn tasks_get_sequential_ids() {
        let store = MemoryStore::new();
        let t1 = TaskStore::create(
            &store,
            &alice(),
            NewTask {
                title: "one".into(),
                description: String::new(),
                priority: Priority::Medium,
            },
        )
        .await
        .unwrap();
        let t2 = TaskStore::create(
            &store,
            &alice(),
            NewTask {
                title: "two".into(),
                description: String::new(),
                priority: Priority::Low,
            },
        )
        .await
        .unwrap();
        assert_eq!(t1.id, 1);
        assert_eq!(t2.id, 2);
    }

    #[tokio::test]
    async fn owner_scoping_matches_sql_backend() {
        let store = MemoryStore::new();
        let task = TaskStore::create(
            &store,
            &alice(),
            NewTask {
                title: "secret".into(),
                description: String::new(),
                priority: Priority::Medium,
            },
        )
        .await
        .unwrap();

        let bob = UserId::new("bob");
        assert!(TaskStore::get(&store, &bob, task.id).await.unwrap().is_none());
        assert!(!TaskStore::delete(&store, &bob, task.id).await.unwrap());
        assert!(TaskStore::get(&store, &alice(), task.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn message_window_and_cascade() {
        let store = MemoryStore::new();
        let conv = Conversation::new(&alice(), "hey");
        ConversationStore::create(&store, &conv).await.unwrap();

        for i in 0..5 {
            store
                .append(&conv.id, NewMessage::user(format!("m{i}")))
                .await
                .unwrap();
        }

        let window = store.messages(&conv.id, 2).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "m3");
        assert_eq!(window[1].content, "m4");

        ConversationStore::delete(&store, &conv.id).await.unwrap();
        assert!(store.messages(&conv.id, 10).await.unwrap().is_empty());
    }
}

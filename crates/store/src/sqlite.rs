//! SQLite backend for tasks and conversations.
//!
//! A single database file with three tables:
//! - `tasks` — one row per to-do item, scoped by owner
//! - `conversations` — conversation shells
//! - `messages` — the append-only turn log, ordered by the
//!   auto-increment `seq` column (never by wall clock)
//!
//! Deleting a conversation cascades to its messages via the foreign key;
//! the `foreign_keys` pragma is switched on at connect time.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use taskling_core::conversation::{Conversation, ConversationId, Role, StoredMessage};
use taskling_core::error::StoreError;
use taskling_core::store::{ConversationStore, NewMessage, NewTask, StatusFilter, TaskPatch, TaskStore};
use taskling_core::task::{Priority, Task, UserId};

/// A production SQLite backend implementing both store traits.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and all tables/indexes are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations — creates tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id    TEXT NOT NULL,
                title       TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                priority    TEXT NOT NULL DEFAULT 'medium',
                completed   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("tasks table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("tasks owner index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id         TEXT PRIMARY KEY,
                owner_id   TEXT NOT NULL,
                title      TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversations table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_owner ON conversations(owner_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversations owner index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq               INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id   TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role              TEXT NOT NULL,
                content           TEXT NOT NULL,
                tool_call         TEXT,
                client_message_id TEXT,
                created_at        TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, seq)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages conversation index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a [`Task`] from a SQLite row.
    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, StoreError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let owner_id: String = row
            .try_get("owner_id")
            .map_err(|e| StoreError::QueryFailed(format!("owner_id column: {e}")))?;
        let title: String = row
            .try_get("title")
            .map_err(|e| StoreError::QueryFailed(format!("title column: {e}")))?;
        let description: String = row
            .try_get("description")
            .map_err(|e| StoreError::QueryFailed(format!("description column: {e}")))?;
        let priority_str: String = row
            .try_get("priority")
            .map_err(|e| StoreError::QueryFailed(format!("priority column: {e}")))?;
        let completed: bool = row
            .try_get("completed")
            .map_err(|e| StoreError::QueryFailed(format!("completed column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;
        let updated_at_str: String = row
            .try_get("updated_at")
            .map_err(|e| StoreError::QueryFailed(format!("updated_at column: {e}")))?;

        Ok(Task {
            id,
            owner_id: UserId::new(owner_id),
            title,
            description,
            priority: Priority::parse(&priority_str).unwrap_or_default(),
            completed,
            created_at: parse_rfc3339(&created_at_str),
            updated_at: parse_rfc3339(&updated_at_str),
        })
    }

    /// Parse a [`StoredMessage`] from a SQLite row.
    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage, StoreError> {
        let seq: i64 = row
            .try_get("seq")
            .map_err(|e| StoreError::QueryFailed(format!("seq column: {e}")))?;
        let conversation_id: String = row
            .try_get("conversation_id")
            .map_err(|e| StoreError::QueryFailed(format!("conversation_id column: {e}")))?;
        let role_str: String = row
            .try_get("role")
            .map_err(|e| StoreError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
        let tool_call_json: Option<String> = row
            .try_get("tool_call")
            .map_err(|e| StoreError::QueryFailed(format!("tool_call column: {e}")))?;
        let client_message_id: Option<String> = row
            .try_get("client_message_id")
            .map_err(|e| StoreError::QueryFailed(format!("client_message_id column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        let tool_call = match tool_call_json {
            Some(json) => Some(
                serde_json::from_str(&json)
                    .map_err(|e| StoreError::QueryFailed(format!("tool_call payload: {e}")))?,
            ),
            None => None,
        };

        Ok(StoredMessage {
            seq,
            conversation_id: ConversationId(conversation_id),
            role: parse_role(&role_str)?,
            content,
            tool_call,
            client_message_id,
            timestamp: parse_rfc3339(&created_at_str),
        })
    }

    /// Parse a [`Conversation`] from a SQLite row.
    fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let owner_id: String = row
            .try_get("owner_id")
            .map_err(|e| StoreError::QueryFailed(format!("owner_id column: {e}")))?;
        let title: Option<String> = row
            .try_get("title")
            .map_err(|e| StoreError::QueryFailed(format!("title column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        Ok(Conversation {
            id: ConversationId(id),
            owner_id: UserId::new(owner_id),
            title,
            created_at: parse_rfc3339(&created_at_str),
        })
    }
}

fn parse_rfc3339(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::Tool => "tool",
    }
}

fn parse_role(s: &str) -> Result<Role, StoreError> {
    match s {
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        "system" => Ok(Role::System),
        "tool" => Ok(Role::Tool),
        other => Err(StoreError::QueryFailed(format!("unknown role: {other}"))),
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn create(&self, owner: &UserId, task: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (owner_id, title, description, priority, completed, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
            "#,
        )
        .bind(owner.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(&now_str)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT task failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(task_id = id, owner = %owner, "Created task");

        Ok(Task {
            id,
            owner_id: owner.clone(),
            title: task.title,
            description: task.description,
            priority: task.priority,
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list(&self, owner: &UserId, filter: StatusFilter) -> Result<Vec<Task>, StoreError> {
        let sql = match filter {
            StatusFilter::All => "SELECT * FROM tasks WHERE owner_id = ?1 ORDER BY id ASC",
            StatusFilter::Pending => {
                "SELECT * FROM tasks WHERE owner_id = ?1 AND completed = 0 ORDER BY id ASC"
            }
            StatusFilter::Completed => {
                "SELECT * FROM tasks WHERE owner_id = ?1 AND completed = 1 ORDER BY id ASC"
            }
        };

        let rows = sqlx::query(sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("LIST tasks: {e}")))?;

        rows.iter().map(Self::row_to_task).collect()
    }

    async fn get(&self, owner: &UserId, id: i64) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET task: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_task(r)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        owner: &UserId,
        id: i64,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let Some(mut task) = TaskStore::get(self, owner, id).await? else {
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

        sqlx::query(
            r#"
            UPDATE tasks SET title = ?1, description = ?2, priority = ?3, updated_at = ?4
            WHERE id = ?5 AND owner_id = ?6
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.updated_at.to_rfc3339())
        .bind(id)
        .bind(owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPDATE task failed: {e}")))?;

        Ok(Some(task))
    }

    async fn complete(&self, owner: &UserId, id: i64) -> Result<Option<Task>, StoreError> {
        let Some(mut task) = TaskStore::get(self, owner, id).await? else {
            return Ok(None);
        };

        // Already-completed tasks are returned as-is; the operation is idempotent.
        if task.completed {
            return Ok(Some(task));
        }

        task.completed = true;
        task.updated_at = Utc::now();

        sqlx::query(
            "UPDATE tasks SET completed = 1, updated_at = ?1 WHERE id = ?2 AND owner_id = ?3",
        )
        .bind(task.updated_at.to_rfc3339())
        .bind(id)
        .bind(owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("COMPLETE task failed: {e}")))?;

        Ok(Some(task))
    }

    async fn delete(&self, owner: &UserId, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE task failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn create(&self, conversation: &Conversation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversations (id, owner_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&conversation.id.0)
        .bind(conversation.owner_id.as_str())
        .bind(&conversation.title)
        .bind(conversation.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT conversation failed: {e}")))?;

        debug!(conversation_id = %conversation.id, "Created conversation");
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET conversation: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_conversation(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, owner: &UserId) -> Result<Vec<Conversation>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM conversations WHERE owner_id = ?1 ORDER BY created_at DESC",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("LIST conversations: {e}")))?;

        rows.iter().map(Self::row_to_conversation).collect()
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, StoreError> {
        // Messages go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE conversation failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn append(
        &self,
        id: &ConversationId,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError> {
        let now = Utc::now();
        let tool_call_json = match &message.tool_call {
            Some(record) => Some(
                serde_json::to_string(record)
                    .map_err(|e| StoreError::Storage(format!("tool_call serialization: {e}")))?,
            ),
            None => None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, role, content, tool_call, client_message_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id.0)
        .bind(role_to_str(message.role))
        .bind(&message.content)
        .bind(&tool_call_json)
        .bind(&message.client_message_id)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT message failed: {e}")))?;

        Ok(StoredMessage {
            seq: result.last_insert_rowid(),
            conversation_id: id.clone(),
            role: message.role,
            content: message.content,
            tool_call: message.tool_call,
            client_message_id: message.client_message_id,
            timestamp: now,
        })
    }

    async fn messages(
        &self,
        id: &ConversationId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        // Most recent `limit` rows, returned oldest-first.
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY seq DESC LIMIT ?2
            ) ORDER BY seq ASC
            "#,
        )
        .bind(&id.0)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("LIST messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn find_client_message(
        &self,
        id: &ConversationId,
        client_message_id: &str,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ?1 AND client_message_id = ?2 LIMIT 1",
        )
        .bind(&id.0)
        .bind(client_message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("FIND client message: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_message(r)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskling_core::conversation::ToolCallRecord;
    use taskling_core::tool::ToolOutcome;

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn bob() -> UserId {
        UserId::new("bob")
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
        }
    }

    #[tokio::test]
    async fn create_and_get_task() {
        let store = test_store().await;
        let created = TaskStore::create(&store, &alice(), new_task("Buy milk"))
            .await
            .unwrap();
        assert!(created.id > 0);
        assert!(!created.completed);

        let fetched = TaskStore::get(&store, &alice(), created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title, "Buy milk");
        assert_eq!(fetched.owner_id.as_str(), "alice");
    }

    #[tokio::test]
    async fn task_ids_increase_in_creation_order() {
        let store = test_store().await;
        let t1 = TaskStore::create(&store, &alice(), new_task("first")).await.unwrap();
        let t2 = TaskStore::create(&store, &alice(), new_task("second")).await.unwrap();
        let t3 = TaskStore::create(&store, &alice(), new_task("third")).await.unwrap();
        assert!(t1.id < t2.id && t2.id < t3.id);

        let listed = TaskStore::list(&store, &alice(), StatusFilter::All).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn list_respects_status_filter() {
        let store = test_store().await;
        let t1 = TaskStore::create(&store, &alice(), new_task("open")).await.unwrap();
        let t2 = TaskStore::create(&store, &alice(), new_task("done")).await.unwrap();
        store.complete(&alice(), t2.id).await.unwrap();

        let pending = TaskStore::list(&store, &alice(), StatusFilter::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, t1.id);

        let completed = TaskStore::list(&store, &alice(), StatusFilter::Completed)
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, t2.id);

        let all = TaskStore::list(&store, &alice(), StatusFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn foreign_task_is_invisible() {
        let store = test_store().await;
        let task = TaskStore::create(&store, &alice(), new_task("private")).await.unwrap();

        assert!(TaskStore::get(&store, &bob(), task.id).await.unwrap().is_none());
        assert!(
            TaskStore::list(&store, &bob(), StatusFilter::All)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .update(&bob(), task.id, TaskPatch { title: Some("stolen".into()), ..Default::default() })
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.complete(&bob(), task.id).await.unwrap().is_none());
        assert!(!TaskStore::delete(&store, &bob(), task.id).await.unwrap());

        // Untouched for the real owner.
        let fetched = TaskStore::get(&store, &alice(), task.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title, "private");
        assert!(!fetched.completed);
    }

    #[tokio::test]
    async fn update_applies_partial_patch() {
        let store = test_store().await;
        let task = TaskStore::create(&store, &alice(), new_task("Draft report"))
            .await
            .unwrap();

        let patch = TaskPatch {
            priority: Some(Priority::High),
            ..Default::default()
        };
        let updated = store.update(&alice(), task.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "Draft report");
        assert_eq!(updated.priority, Priority::High);
        assert!(updated.updated_at >= task.updated_at);
    }

    #[tokio::test]
    async fn complete_is_idempotent() {
        let store = test_store().await;
        let task = TaskStore::create(&store, &alice(), new_task("finish")).await.unwrap();

        let first = store.complete(&alice(), task.id).await.unwrap().unwrap();
        assert!(first.completed);

        let second = store.complete(&alice(), task.id).await.unwrap().unwrap();
        assert!(second.completed);
        assert_eq!(second.updated_at, first.updated_at);
    }

    #[tokio::test]
    async fn delete_task() {
        let store = test_store().await;
        let task = TaskStore::create(&store, &alice(), new_task("temp")).await.unwrap();

        assert!(TaskStore::delete(&store, &alice(), task.id).await.unwrap());
        assert!(!TaskStore::delete(&store, &alice(), task.id).await.unwrap());
        assert!(TaskStore::get(&store, &alice(), task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conversation_lifecycle() {
        let store = test_store().await;
        let conv = Conversation::new(&alice(), "plan my week");
        ConversationStore::create(&store, &conv).await.unwrap();

        let fetched = ConversationStore::get(&store, &conv.id).await.unwrap().unwrap();
        assert_eq!(fetched.owner_id.as_str(), "alice");
        assert_eq!(fetched.title.as_deref(), Some("plan my week"));

        let listed = ConversationStore::list(&store, &alice()).await.unwrap();
        assert_eq!(listed.len(), 1);

        assert!(ConversationStore::delete(&store, &conv.id).await.unwrap());
        assert!(ConversationStore::get(&store, &conv.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_assigns_increasing_seq() {
        let store = test_store().await;
        let conv = Conversation::new(&alice(), "hello");
        ConversationStore::create(&store, &conv).await.unwrap();

        let m1 = store.append(&conv.id, NewMessage::user("one")).await.unwrap();
        let m2 = store.append(&conv.id, NewMessage::assistant("two")).await.unwrap();
        let m3 = store.append(&conv.id, NewMessage::user("three")).await.unwrap();
        assert!(m1.seq < m2.seq && m2.seq < m3.seq);

        let all = store.messages(&conv.id, 50).await.unwrap();
        assert_eq!(all.len(), 3);
        let contents: Vec<&str> = all.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn messages_window_keeps_most_recent() {
        let store = test_store().await;
        let conv = Conversation::new(&alice(), "long chat");
        ConversationStore::create(&store, &conv).await.unwrap();

        for i in 0..10 {
            store
                .append(&conv.id, NewMessage::user(format!("msg {i}")))
                .await
                .unwrap();
        }

        let window = store.messages(&conv.id, 3).await.unwrap();
        assert_eq!(window.len(), 3);
        // Most recent three, oldest first.
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 7", "msg 8", "msg 9"]);
    }

    #[tokio::test]
    async fn delete_conversation_cascades_to_messages() {
        let store = test_store().await;
        let conv = Conversation::new(&alice(), "doomed");
        ConversationStore::create(&store, &conv).await.unwrap();
        store.append(&conv.id, NewMessage::user("hello")).await.unwrap();
        store.append(&conv.id, NewMessage::assistant("hi")).await.unwrap();

        assert!(ConversationStore::delete(&store, &conv.id).await.unwrap());
        let remaining = store.messages(&conv.id, 50).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn tool_call_record_round_trips() {
        let store = test_store().await;
        let conv = Conversation::new(&alice(), "tool turn");
        ConversationStore::create(&store, &conv).await.unwrap();

        let record = ToolCallRecord {
            call_id: "call_abc".into(),
            name: "create_task".into(),
            arguments: serde_json::json!({"title": "Buy milk", "priority": "high"}),
            outcome: ToolOutcome::ok(serde_json::json!({"id": 1, "title": "Buy milk"})),
        };
        store.append(&conv.id, NewMessage::tool(record)).await.unwrap();

        let all = store.messages(&conv.id, 10).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].role, Role::Tool);
        let stored = all[0].tool_call.as_ref().unwrap();
        assert_eq!(stored.call_id, "call_abc");
        assert_eq!(stored.name, "create_task");
        assert_eq!(stored.arguments["priority"], "high");
        assert!(stored.outcome.success);
    }

    #[tokio::test]
    async fn find_client_message_for_dedup() {
        let store = test_store().await;
        let conv = Conversation::new(&alice(), "retry test");
        ConversationStore::create(&store, &conv).await.unwrap();

        store
            .append(
                &conv.id,
                NewMessage::user("add milk").with_client_message_id("cmid-1"),
            )
            .await
            .unwrap();

        let found = store.find_client_message(&conv.id, "cmid-1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().content, "add milk");

        assert!(store.find_client_message(&conv.id, "cmid-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conversations_isolated_per_owner() {
        let store = test_store().await;
        let a = Conversation::new(&alice(), "mine");
        let b = Conversation::new(&bob(), "theirs");
        ConversationStore::create(&store, &a).await.unwrap();
        ConversationStore::create(&store, &b).await.unwrap();

        let alices = ConversationStore::list(&store, &alice()).await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].id, a.id);
    }
}

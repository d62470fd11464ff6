//! PostgreSQL backend for tasks and conversations.
//!
//! Implements both store traits with the same semantics as the SQLite
//! backend; ids and message ordering come from BIGSERIAL columns.
//!
//! # Setup
//!
//! Run [`PgStore::migrate`] once after connecting; it applies
//! `migrations/001_create_tables.sql`.
//!
//! # Feature gate
//!
//! This module is behind the `postgres` feature flag:
//!
//! ```toml
//! taskling-store = { workspace = true, features = ["postgres"] }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tracing::{debug, info};

use taskling_core::conversation::{Conversation, ConversationId, Role, StoredMessage};
use taskling_core::error::StoreError;
use taskling_core::store::{ConversationStore, NewMessage, NewTask, StatusFilter, TaskPatch, TaskStore};
use taskling_core::task::{Priority, Task, UserId};

/// PostgreSQL backend implementing both store traits.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new PostgreSQL store from a connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Storage(format!("PostgreSQL connection failed: {e}")))?;

        info!("Connected to PostgreSQL store");
        Ok(Self { pool })
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the schema migration.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let migration_sql = include_str!("../migrations/001_create_tables.sql");

        sqlx::raw_sql(migration_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Migration failed: {e}")))?;

        info!("Postgres schema migration complete");
        Ok(())
    }

    fn row_to_task(row: &PgRow) -> Result<Task, StoreError> {
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
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| StoreError::QueryFailed(format!("updated_at column: {e}")))?;

        Ok(Task {
            id,
            owner_id: UserId::new(owner_id),
            title,
            description,
            priority: Priority::parse(&priority_str).unwrap_or_default(),
            completed,
            created_at,
            updated_at,
        })
    }

    fn row_to_message(row: &PgRow) -> Result<StoredMessage, StoreError> {
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
        let created_at: DateTime<Utc> = row
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
            timestamp: created_at,
        })
    }

    fn row_to_conversation(row: &PgRow) -> Result<Conversation, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let owner_id: String = row
            .try_get("owner_id")
            .map_err(|e| StoreError::QueryFailed(format!("owner_id column: {e}")))?;
        let title: Option<String> = row
            .try_get("title")
            .map_err(|e| StoreError::QueryFailed(format!("title column: {e}")))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        Ok(Conversation {
            id: ConversationId(id),
            owner_id: UserId::new(owner_id),
            title,
            created_at,
        })
    }
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
impl TaskStore for PgStore {
    async fn create(&self, owner: &UserId, task: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO tasks (owner_id, title, description, priority, completed, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, FALSE, $5, $5) \
             RETURNING id",
        )
        .bind(owner.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT task failed: {e}")))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
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
            StatusFilter::All => "SELECT * FROM tasks WHERE owner_id = $1 ORDER BY id ASC",
            StatusFilter::Pending => {
                "SELECT * FROM tasks WHERE owner_id = $1 AND completed = FALSE ORDER BY id ASC"
            }
            StatusFilter::Completed => {
                "SELECT * FROM tasks WHERE owner_id = $1 AND completed = TRUE ORDER BY id ASC"
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
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1 AND owner_id = $2")
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
            "UPDATE tasks SET title = $1, description = $2, priority = $3, updated_at = $4 \
             WHERE id = $5 AND owner_id = $6",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.updated_at)
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

        if task.completed {
            return Ok(Some(task));
        }

        task.completed = true;
        task.updated_at = Utc::now();

        sqlx::query(
            "UPDATE tasks SET completed = TRUE, updated_at = $1 WHERE id = $2 AND owner_id = $3",
        )
        .bind(task.updated_at)
        .bind(id)
        .bind(owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("COMPLETE task failed: {e}")))?;

        Ok(Some(task))
    }

    async fn delete(&self, owner: &UserId, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE task failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn create(&self, conversation: &Conversation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversations (id, owner_id, title, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&conversation.id.0)
        .bind(conversation.owner_id.as_str())
        .bind(&conversation.title)
        .bind(conversation.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT conversation failed: {e}")))?;

        debug!(conversation_id = %conversation.id, "Created conversation");
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = $1")
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
            "SELECT * FROM conversations WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("LIST conversations: {e}")))?;

        rows.iter().map(Self::row_to_conversation).collect()
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, StoreError> {
        // Messages go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
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

        let row = sqlx::query(
            "INSERT INTO messages (conversation_id, role, content, tool_call, client_message_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING seq",
        )
        .bind(&id.0)
        .bind(role_to_str(message.role))
        .bind(&message.content)
        .bind(&tool_call_json)
        .bind(&message.client_message_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT message failed: {e}")))?;

        let seq: i64 = row
            .try_get("seq")
            .map_err(|e| StoreError::QueryFailed(format!("seq column: {e}")))?;

        Ok(StoredMessage {
            seq,
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
            "SELECT * FROM ( \
                SELECT * FROM messages WHERE conversation_id = $1 ORDER BY seq DESC LIMIT $2 \
             ) recent ORDER BY seq ASC",
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
            "SELECT * FROM messages WHERE conversation_id = $1 AND client_message_id = $2 LIMIT 1",
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

// ── Unit tests (no DB required) ──────────────────────────────────────────

//! `complete_task` — mark a task done. Idempotent.

use serde::Deserialize;

use taskling_core::error::StoreError;
use taskling_core::store::TaskStore;
use taskling_core::task::UserId;
use taskling_core::tool::{ToolDefinition, ToolOutcome};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteTaskArgs {
    pub task_id: i64,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "complete_task".into(),
        description: "Mark a task as completed. Completing an already-completed task succeeds \
                      and changes nothing. If the user refers to a task by name, call \
                      list_tasks first to find its id. Example: for 'I bought the milk' call \
                      with {\"task_id\": 7}."
            .into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "integer",
                    "description": "The task id, as returned by create_task or list_tasks."
                }
            },
            "required": ["task_id"],
            "additionalProperties": false
        }),
    }
}

pub async fn run(
    args: CompleteTaskArgs,
    store: &dyn TaskStore,
    caller: &UserId,
) -> std::result::Result<ToolOutcome, StoreError> {
    match store.complete(caller, args.task_id).await? {
        Some(task) => Ok(ToolOutcome::ok(task.to_tool_payload())),
        None => Ok(crate::task_not_found(args.task_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskling_core::store::NewTask;
    use taskling_core::task::Priority;
    use taskling_core::tool::ToolErrorCode;
    use taskling_store::MemoryStore;

    fn alice() -> UserId {
        UserId::new("alice")
    }

    async fn seed(store: &MemoryStore) -> i64 {
        let task = TaskStore::create(
            store,
            &alice(),
            NewTask {
                title: "Buy milk".into(),
                description: String::new(),
                priority: Priority::Medium,
            },
        )
        .await
        .unwrap();
        task.id
    }

    #[tokio::test]
    async fn completes_a_task() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let outcome = run(CompleteTaskArgs { task_id: id }, &store, &alice())
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap()["completed"], true);
    }

    #[tokio::test]
    async fn completing_twice_succeeds_both_times() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let first = run(CompleteTaskArgs { task_id: id }, &store, &alice())
            .await
            .unwrap();
        let second = run(CompleteTaskArgs { task_id: id }, &store, &alice())
            .await
            .unwrap();

        assert!(first.success);
        assert!(second.success);
        assert_eq!(second.data.unwrap()["completed"], true);
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let store = MemoryStore::new();
        let outcome = run(CompleteTaskArgs { task_id: 404 }, &store, &alice())
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(ToolErrorCode::NotFound));
    }

    #[tokio::test]
    async fn foreign_task_is_not_found() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let outcome = run(CompleteTaskArgs { task_id: id }, &store, &UserId::new("bob"))
            .await
            .unwrap();
        assert_eq!(outcome.error, Some(ToolErrorCode::NotFound));

        let task = TaskStore::get(&store, &alice(), id).await.unwrap().unwrap();
        assert!(!task.completed);
    }
}

//! `delete_task` — hard delete.

use serde::Deserialize;
use tracing::debug;

use taskling_core::error::StoreError;
use taskling_core::store::TaskStore;
use taskling_core::task::UserId;
use taskling_core::tool::{ToolDefinition, ToolOutcome};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteTaskArgs {
    pub task_id: i64,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "delete_task".into(),
        description: "Delete a task permanently. This cannot be undone; for finished tasks \
                      prefer complete_task. If the user refers to a task by name, call \
                      list_tasks first to find its id. Example: for 'remove the milk task' \
                      call with {\"task_id\": 7}."
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
    args: DeleteTaskArgs,
    store: &dyn TaskStore,
    caller: &UserId,
) -> std::result::Result<ToolOutcome, StoreError> {
    if store.delete(caller, args.task_id).await? {
        debug!(task_id = args.task_id, "Task deleted");
        Ok(ToolOutcome::ok(serde_json::json!({
            "deleted": true,
            "task_id": args.task_id,
        })))
    } else {
        Ok(crate::task_not_found(args.task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskling_core::store::{NewTask, StatusFilter};
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
    async fn deletes_a_task() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let outcome = run(DeleteTaskArgs { task_id: id }, &store, &alice())
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap()["deleted"], true);

        let remaining = TaskStore::list(&store, &alice(), StatusFilter::All)
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found_the_second_time() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        run(DeleteTaskArgs { task_id: id }, &store, &alice())
            .await
            .unwrap();
        let second = run(DeleteTaskArgs { task_id: id }, &store, &alice())
            .await
            .unwrap();
        assert_eq!(second.error, Some(ToolErrorCode::NotFound));
    }

    #[tokio::test]
    async fn foreign_task_is_not_found_and_survives() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let outcome = run(DeleteTaskArgs { task_id: id }, &store, &UserId::new("bob"))
            .await
            .unwrap();
        assert_eq!(outcome.error, Some(ToolErrorCode::NotFound));
        assert!(TaskStore::get(&store, &alice(), id).await.unwrap().is_some());
    }
}

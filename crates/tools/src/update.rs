//! `update_task` — partial update of title, description, or priority.
//!
//! Completion state is not updatable here; that goes through
//! `complete_task`.

use serde::Deserialize;

use taskling_core::error::StoreError;
use taskling_core::store::{TaskPatch, TaskStore};
use taskling_core::task::UserId;
use taskling_core::tool::{ToolDefinition, ToolErrorCode, ToolOutcome};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskArgs {
    pub task_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "update_task".into(),
        description: "Change the title, description, or priority of an existing task. Only \
                      the fields you pass are changed. If the user refers to a task by name, \
                      call list_tasks first to find its id. Example: for 'make the milk task \
                      low priority' call with {\"task_id\": 7, \"priority\": \"low\"}."
            .into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "integer",
                    "description": "The task id, as returned by create_task or list_tasks."
                },
                "title": {
                    "type": "string",
                    "description": "New title. At most 200 characters."
                },
                "description": {
                    "type": "string",
                    "description": "New description. At most 1000 characters."
                },
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "New priority."
                }
            },
            "required": ["task_id"],
            "additionalProperties": false
        }),
    }
}

fn validate(args: &UpdateTaskArgs) -> std::result::Result<TaskPatch, ToolOutcome> {
    let mut patch = TaskPatch::default();
    if let Some(title) = &args.title {
        patch.title = Some(crate::valid_title(title)?);
    }
    if let Some(description) = &args.description {
        patch.description = Some(crate::valid_description(description)?);
    }
    if let Some(priority) = &args.priority {
        patch.priority = Some(crate::valid_priority(priority)?);
    }
    if patch.is_empty() {
        return Err(ToolOutcome::failure(
            ToolErrorCode::InvalidArguments,
            "at least one of title, description, or priority is required",
        ));
    }
    Ok(patch)
}

pub async fn run(
    args: UpdateTaskArgs,
    store: &dyn TaskStore,
    caller: &UserId,
) -> std::result::Result<ToolOutcome, StoreError> {
    let patch = match validate(&args) {
        Ok(p) => p,
        Err(outcome) => return Ok(outcome),
    };

    match store.update(caller, args.task_id, patch).await? {
        Some(task) => Ok(ToolOutcome::ok(task.to_tool_payload())),
        None => Ok(crate::task_not_found(args.task_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskling_core::store::NewTask;
    use taskling_core::task::Priority;
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
                description: "2 liters".into(),
                priority: Priority::Medium,
            },
        )
        .await
        .unwrap();
        task.id
    }

    #[tokio::test]
    async fn updates_only_the_given_fields() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let outcome = run(
            UpdateTaskArgs {
                task_id: id,
                title: None,
                description: None,
                priority: Some("high".into()),
            },
            &store,
            &alice(),
        )
        .await
        .unwrap();

        let data = outcome.data.unwrap();
        assert_eq!(data["priority"], "high");
        assert_eq!(data["title"], "Buy milk");
        assert_eq!(data["description"], "2 liters");
    }

    #[tokio::test]
    async fn empty_patch_is_invalid_arguments() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let outcome = run(
            UpdateTaskArgs {
                task_id: id,
                title: None,
                description: None,
                priority: None,
            },
            &store,
            &alice(),
        )
        .await
        .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(ToolErrorCode::InvalidArguments));
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let store = MemoryStore::new();
        let outcome = run(
            UpdateTaskArgs {
                task_id: 99,
                title: Some("new".into()),
                description: None,
                priority: None,
            },
            &store,
            &alice(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.error, Some(ToolErrorCode::NotFound));
    }

    #[tokio::test]
    async fn foreign_task_is_reported_as_not_found_and_unchanged() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let outcome = run(
            UpdateTaskArgs {
                task_id: id,
                title: Some("hijacked".into()),
                description: None,
                priority: None,
            },
            &store,
            &UserId::new("bob"),
        )
        .await
        .unwrap();
        assert_eq!(outcome.error, Some(ToolErrorCode::NotFound));

        let task = TaskStore::get(&store, &alice(), id).await.unwrap().unwrap();
        assert_eq!(task.title, "Buy milk");
    }

    #[tokio::test]
    async fn invalid_new_title_is_invalid_field() {
        let store = MemoryStore::new();
        let id = seed(&store).await;

        let outcome = run(
            UpdateTaskArgs {
                task_id: id,
                title: Some("   ".into()),
                description: None,
                priority: None,
            },
            &store,
            &alice(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.error, Some(ToolErrorCode::InvalidField));
    }
}

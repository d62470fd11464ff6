//! `list_tasks` — list the caller's tasks in creation order.

use serde::Deserialize;

use taskling_core::error::StoreError;
use taskling_core::store::{StatusFilter, TaskStore};
use taskling_core::task::UserId;
use taskling_core::tool::{ToolDefinition, ToolErrorCode, ToolOutcome};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListTasksArgs {
    #[serde(default)]
    pub status: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_tasks".into(),
        description: "List the user's tasks in the order they were created. Use this to show \
                      the list, to count tasks, or to find a task's id before updating, \
                      completing, or deleting it. Example: for 'what's still open?' call with \
                      {\"status\": \"pending\"}."
            .into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["pending", "completed", "all"],
                    "description": "Filter by completion state. Defaults to 'all'."
                }
            },
            "required": [],
            "additionalProperties": false
        }),
    }
}

pub async fn run(
    args: ListTasksArgs,
    store: &dyn TaskStore,
    caller: &UserId,
) -> std::result::Result<ToolOutcome, StoreError> {
    let filter = match args.status.as_deref() {
        Some(s) => match StatusFilter::parse(s) {
            Some(f) => f,
            None => {
                return Ok(ToolOutcome::failure(
                    ToolErrorCode::InvalidField,
                    format!("unknown status '{s}', expected pending | completed | all"),
                ));
            }
        },
        None => StatusFilter::All,
    };

    let tasks = store.list(caller, filter).await?;
    let items: Vec<serde_json::Value> = tasks.iter().map(|t| t.to_tool_payload()).collect();
    Ok(ToolOutcome::ok(serde_json::json!({
        "count": items.len(),
        "tasks": items,
    })))
}

//! `create_task` — add a task to the caller's list.

use serde::Deserialize;
use tracing::debug;

use taskling_core::error::StoreError;
use taskling_core::store::{NewTask, TaskStore};
use taskling_core::task::{Priority, UserId};
use taskling_core::tool::{ToolDefinition, ToolOutcome};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskArgs {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "create_task".into(),
        description: "Create a new task on the user's to-do list. Use this when the user asks \
                      to add, remember, or schedule something. Example: for 'add buy milk to \
                      my list, it's urgent' call with {\"title\": \"Buy milk\", \"priority\": \
                      \"high\"}."
            .into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Short task summary, e.g. 'Buy milk'. At most 200 characters."
                },
                "description": {
                    "type": "string",
                    "description": "Optional longer detail, e.g. '2 liters, whole'. At most 1000 characters."
                },
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "Task priority. Defaults to 'medium' when omitted."
                }
            },
            "required": ["title"],
            "additionalProperties": false
        }),
    }
}

fn validate(args: CreateTaskArgs) -> std::result::Result<NewTask, ToolOutcome> {
    let title = crate::valid_title(&args.title)?;
    let description = match args.description {
        Some(d) => crate::valid_description(&d)?,
        None => String::new(),
    };
    let priority = match args.priority.as_deref() {
        Some(p) => crate::valid_priority(p)?,
        None => Priority::default(),
    };
    Ok(NewTask {
        title,
        description,
        priority,
    })
}

pub async fn run(
    args: CreateTaskArgs,
    store: &dyn TaskStore,
    caller: &UserId,
) -> std::result::Result<ToolOutcome, StoreError> {
    let new_task = match validate(args) {
        Ok(t) => t,
        Err(outcome) => return Ok(outcome),
    };

    let task = store.create(caller, new_task).await?;
    debug!(task_id = task.id, "Task created");
    Ok(ToolOutcome::ok(task.to_tool_payload()))
}

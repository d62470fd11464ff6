//! # Taskling Tools
//!
//! The agent's task tools: `create_task`, `list_tasks`, `update_task`,
//! `complete_task`, `delete_task`.
//!
//! The tool set is a closed enum, not a name→callable map: a new tool is a
//! new variant, and the compiler walks every dispatch site. Arguments are
//! validated against per-tool structs (unknown fields rejected) before any
//! store call. Every failure a tool can produce comes back as a
//! [`ToolOutcome`] the model can read and react to; only storage failures
//! propagate as errors.
//!
//! Every store call carries the authenticated caller. A task owned by
//! someone else is reported as `not_found`, indistinguishable from a task
//! that does not exist.

pub mod complete;
pub mod create;
pub mod delete;
pub mod list;
pub mod update;

use serde::de::DeserializeOwned;
use tracing::debug;

use taskling_core::error::StoreError;
use taskling_core::store::TaskStore;
use taskling_core::task::{Priority, UserId, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
use taskling_core::tool::{ToolDefinition, ToolErrorCode, ToolOutcome};

pub use complete::CompleteTaskArgs;
pub use create::CreateTaskArgs;
pub use delete::DeleteTaskArgs;
pub use list::ListTasksArgs;
pub use update::UpdateTaskArgs;

/// One validated tool call, ready to execute.
#[derive(Debug, Clone)]
pub enum TaskToolCall {
    Create(CreateTaskArgs),
    List(ListTasksArgs),
    Update(UpdateTaskArgs),
    Complete(CompleteTaskArgs),
    Delete(DeleteTaskArgs),
}

impl TaskToolCall {
    /// Validate a tool name and argument object against the closed set.
    ///
    /// The `Err` side is not an error to throw — it is the
    /// `invalid_arguments` outcome to hand back to the model so it can
    /// self-correct on the next round.
    pub fn parse(
        name: &str,
        arguments: &serde_json::Value,
    ) -> std::result::Result<Self, ToolOutcome> {
        match name {
            "create_task" => Ok(Self::Create(from_args(arguments)?)),
            "list_tasks" => Ok(Self::List(from_args(arguments)?)),
            "update_task" => Ok(Self::Update(from_args(arguments)?)),
            "complete_task" => Ok(Self::Complete(from_args(arguments)?)),
            "delete_task" => Ok(Self::Delete(from_args(arguments)?)),
            other => Err(ToolOutcome::failure(
                ToolErrorCode::InvalidArguments,
                format!("unknown tool: {other}"),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create_task",
            Self::List(_) => "list_tasks",
            Self::Update(_) => "update_task",
            Self::Complete(_) => "complete_task",
            Self::Delete(_) => "delete_task",
        }
    }

    /// Execute against the task store on behalf of `caller`.
    ///
    /// Business failures (`not_found`, `invalid_field`, ...) come back as
    /// `Ok` outcomes; only infrastructure failures are `Err`.
    pub async fn execute(
        self,
        store: &dyn TaskStore,
        caller: &UserId,
    ) -> std::result::Result<ToolOutcome, StoreError> {
        match self {
            Self::Create(args) => create::run(args, store, caller).await,
            Self::List(args) => list::run(args, store, caller).await,
            Self::Update(args) => update::run(args, store, caller).await,
            Self::Complete(args) => complete::run(args, store, caller).await,
            Self::Delete(args) => delete::run(args, store, caller).await,
        }
    }
}

/// Parse + execute in one step. The orchestrator's entry point.
pub async fn invoke(
    name: &str,
    arguments: &serde_json::Value,
    store: &dyn TaskStore,
    caller: &UserId,
) -> std::result::Result<ToolOutcome, StoreError> {
    debug!(tool = name, caller = %caller, "Invoking tool");
    let call = match TaskToolCall::parse(name, arguments) {
        Ok(call) => call,
        Err(outcome) => return Ok(outcome),
    };
    call.execute(store, caller).await
}

/// The five tool definitions advertised to the model.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        create::definition(),
        list::definition(),
        update::definition(),
        complete::definition(),
        delete::definition(),
    ]
}

fn from_args<T: DeserializeOwned>(
    arguments: &serde_json::Value,
) -> std::result::Result<T, ToolOutcome> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| ToolOutcome::failure(ToolErrorCode::InvalidArguments, e.to_string()))
}

// --- Field validation shared by create and update ---

pub(crate) fn valid_title(raw: &str) -> std::result::Result<String, ToolOutcome> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ToolOutcome::failure(
            ToolErrorCode::InvalidField,
            "title must not be empty",
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ToolOutcome::failure(
            ToolErrorCode::InvalidField,
            format!("title exceeds {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(title.to_string())
}

pub(crate) fn valid_description(raw: &str) -> std::result::Result<String, ToolOutcome> {
    if raw.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ToolOutcome::failure(
            ToolErrorCode::InvalidField,
            format!("description exceeds {MAX_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(raw.to_string())
}

pub(crate) fn valid_priority(raw: &str) -> std::result::Result<Priority, ToolOutcome> {
    Priority::parse(raw).ok_or_else(|| {
        ToolOutcome::failure(
            ToolErrorCode::InvalidField,
            format!("unknown priority '{raw}', expected low | medium | high"),
        )
    })
}

pub(crate) fn task_not_found(id: i64) -> ToolOutcome {
    ToolOutcome::failure(ToolErrorCode::NotFound, format!("task {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskling_store::MemoryStore;

    fn alice() -> UserId {
        UserId::new("alice")
    }

    #[test]
    fn definitions_cover_the_closed_set() {
        let defs = definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "create_task",
                "list_tasks",
                "update_task",
                "complete_task",
                "delete_task"
            ]
        );
        for def in &defs {
            assert_eq!(def.parameters["type"], "object");
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn parse_rejects_unknown_tool() {
        let outcome = TaskToolCall::parse("drop_database", &serde_json::json!({})).unwrap_err();
        assert_eq!(outcome.error, Some(ToolErrorCode::InvalidArguments));
        assert!(outcome.message.as_deref().unwrap().contains("drop_database"));
    }

    #[test]
    fn parse_rejects_unknown_field() {
        let outcome = TaskToolCall::parse(
            "create_task",
            &serde_json::json!({"title": "ok", "owner_id": "bob"}),
        )
        .unwrap_err();
        assert_eq!(outcome.error, Some(ToolErrorCode::InvalidArguments));
    }

    #[test]
    fn parse_rejects_missing_required_field() {
        let outcome =
            TaskToolCall::parse("create_task", &serde_json::json!({"priority": "high"}))
                .unwrap_err();
        assert_eq!(outcome.error, Some(ToolErrorCode::InvalidArguments));
        assert!(outcome.message.as_deref().unwrap().contains("title"));
    }

    #[test]
    fn parse_rejects_mistyped_field() {
        let outcome =
            TaskToolCall::parse("complete_task", &serde_json::json!({"task_id": "seven"}))
                .unwrap_err();
        assert_eq!(outcome.error, Some(ToolErrorCode::InvalidArguments));
    }

    #[test]
    fn parse_rejects_non_object_arguments() {
        // Malformed model output is threaded through as a JSON string
        let raw = serde_json::Value::String("{\"title\": oops".into());
        let outcome = TaskToolCall::parse("create_task", &raw).unwrap_err();
        assert_eq!(outcome.error, Some(ToolErrorCode::InvalidArguments));
    }

    #[tokio::test]
    async fn invoke_dispatches_to_the_right_tool() {
        let store = MemoryStore::new();
        let outcome = invoke(
            "create_task",
            &serde_json::json!({"title": "buy milk", "priority": "high"}),
            &store,
            &alice(),
        )
        .await
        .unwrap();

        assert!(outcome.success);
        let data = outcome.data.unwrap();
        assert_eq!(data["title"], "buy milk");
        assert_eq!(data["priority"], "high");
        assert_eq!(data["completed"], false);
    }

    #[tokio::test]
    async fn invoke_returns_parse_failures_as_outcomes() {
        let store = MemoryStore::new();
        let outcome = invoke("make_coffee", &serde_json::json!({}), &store, &alice())
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(ToolErrorCode::InvalidArguments));
    }

    #[test]
    fn title_validation_trims_and_bounds() {
        assert_eq!(valid_title("  buy milk  ").unwrap(), "buy milk");
        assert!(valid_title("   ").is_err());
        assert!(valid_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(valid_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }
}

//! Tool outcome and definition types.
//!
//! Shared by the tool layer (which produces outcomes), the orchestrator
//! (which feeds them back to the model), and the conversation log (which
//! persists them inside turn records).

use serde::{Deserialize, Serialize};

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Stable machine-readable failure codes carried in tool outcomes.
///
/// The model sees these verbatim and conditions its replies on them, so the
/// set only grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorCode {
    /// Arguments failed schema validation (missing, mistyped, unknown field).
    InvalidArguments,
    /// A field value was out of range (empty title, unknown priority, ...).
    InvalidField,
    /// The task does not exist for this caller.
    NotFound,
    /// The tool itself failed; retrying may help.
    Internal,
}

impl ToolErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorCode::InvalidArguments => "invalid_arguments",
            ToolErrorCode::InvalidField => "invalid_field",
            ToolErrorCode::NotFound => "not_found",
            ToolErrorCode::Internal => "internal",
        }
    }
}

/// The structured result of one tool execution.
///
/// Every failure mode a tool can hit is representable here as data; nothing
/// recoverable crosses the tool boundary as an error. Serializes as
/// `{"success":true,"data":...}` or
/// `{"success":false,"error":"not_found","message":"..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolErrorCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolOutcome {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn failure(code: ToolErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(code),
            message: Some(message.into()),
        }
    }

    /// The JSON string fed back to the model as the tool result content.
    pub fn to_model_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":"internal","message":"unserializable tool outcome"}"#
                .to_string()
        })
    }
}

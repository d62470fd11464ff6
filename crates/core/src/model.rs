//! Model client trait — the boundary between the agent and the language model.
//!
//! A client takes the rendered conversation plus the tool definitions and
//! returns either assistant text or requested tool calls. The HTTP
//! implementation lives in `taskling-model`; tests script this trait
//! directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Role;
use crate::error::ModelError;
use crate::tool::ToolDefinition;

/// One message on the wire to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,

    pub content: String,

    /// Tool calls attached to an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// For `Role::Tool` messages: which call this result answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// The assistant message that carried tool calls, replayed from history.
    pub fn assistant_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// A tool result answering `call_id`.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Model-assigned id, echoed back in the matching tool result
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Raw argument JSON exactly as the model produced it
    pub arguments: String,
}

/// A completion request: full context, tool schemas, decoding knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "gpt-4o-mini", "anthropic/claude-sonnet-4")
    pub model: String,

    /// System prompt, history, and the new user message, oldest first
    pub messages: Vec<ChatMessage>,

    /// Temperature (low by default; tool dispatch wants determinism)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.2
}

/// A completion: assistant text, tool calls to execute, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Assistant text. May be empty when the model only requests tools.
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage, when the API reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Completion {
    /// True when the model wants tools executed before it can answer.
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The model client boundary.
///
/// One method the orchestrator depends on: `complete()`. Implementations
/// must enforce an explicit request timeout and map every transport failure
/// into a [`ModelError`] — a misbehaving upstream is a recoverable turn
/// failure, never a crash.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A short client name for logs (e.g., "openai-compat", "scripted").
    fn name(&self) -> &str;

    /// Send the full context and get a completion back.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<Completion, ModelError>;

    /// Can we reach the upstream at all? Used by `taskling doctor`.
    async fn health_check(&self) -> std::result::Result<bool, ModelError> {
        Ok(true)
    }
}

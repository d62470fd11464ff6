//! The turn orchestrator — one stateless state machine per chat request.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use taskling_config::AppConfig;
use taskling_core::conversation::{Conversation, ConversationId, ToolCallRecord};
use taskling_core::error::{Error, Result};
use taskling_core::model::{ChatMessage, CompletionRequest, ModelClient};
use taskling_core::store::{ConversationStore, NewMessage, TaskStore};
use taskling_core::task::UserId;
use taskling_core::tool::{ToolErrorCode, ToolOutcome};

use crate::context::ContextLoader;
use crate::locks::TurnLocks;

/// The built-in system prompt. Replaceable via
/// `[agent] system_prompt_override` in the config file.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Taskling, an assistant that manages the user's to-do list through tools.

Rules:
- Any change to the list goes through a tool call; never claim to have \
created, updated, completed, or deleted a task without the matching tool result.
- Task ids come from create_task and list_tasks results only; when the user \
refers to a task by name, call list_tasks to find its id instead of guessing.
- When a tool returns an error, explain the problem conversationally and, \
where sensible, suggest what the user can do next.
- Answer in plain language; never show raw JSON, tool names, or ids unless \
the user asks for them.
- Be concise. Confirm what changed after every successful tool call.";

/// The reply synthesized when the model keeps requesting tools past the
/// round limit.
const ROUND_LIMIT_REPLY: &str = "I couldn't finish that request within my \
tool budget. Some steps may already have been applied — ask me to list your \
tasks to see where things stand, then try again with a smaller request.";

/// One inbound chat turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Absent on the first message of a new conversation
    pub conversation_id: Option<ConversationId>,

    pub message: String,

    /// Client-generated idempotency key; a retried request carrying the same
    /// key does not insert the user message twice
    pub client_message_id: Option<String>,
}

/// The orchestrator's answer to one turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub conversation_id: ConversationId,
    pub reply: String,
}

/// Drives one chat turn end to end: context load, model rounds, tool
/// execution, persistence.
///
/// Holds no per-conversation state. The stores are the only shared mutable
/// resources, and the per-conversation [`TurnLocks`] are the only
/// serialization this layer adds.
pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    tasks: Arc<dyn TaskStore>,
    conversations: Arc<dyn ConversationStore>,
    loader: ContextLoader,
    locks: TurnLocks,
    model_name: String,
    temperature: f32,
    max_tokens: Option<u32>,
    context_limit: usize,
    max_tool_rounds: u32,
    system_prompt: String,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tasks: Arc<dyn TaskStore>,
        conversations: Arc<dyn ConversationStore>,
        config: &AppConfig,
    ) -> Self {
        let system_prompt = config
            .agent
            .system_prompt_override
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        Self {
            model,
            tasks,
            loader: ContextLoader::new(conversations.clone()),
            conversations,
            locks: TurnLocks::new(),
            model_name: config.model.model.clone(),
            temperature: config.model.temperature,
            max_tokens: Some(config.model.max_tokens),
            context_limit: config.agent.context_limit,
            max_tool_rounds: config.agent.max_tool_rounds,
            system_prompt,
        }
    }

    /// Read-only access to the context loader, for handlers that list or
    /// fetch conversations under the same ownership rules as the chat path.
    pub fn loader(&self) -> &ContextLoader {
        &self.loader
    }

    /// Handle one chat turn for `caller`.
    ///
    /// On success the conversation log has gained a `user` row (unless the
    /// request was a deduplicated retry), one `tool` row per executed call,
    /// and an `assistant` row, in that order. On a model failure only the
    /// user row remains; task-store effects of already-executed tools are
    /// real and are not rolled back.
    pub async fn handle_turn(&self, caller: &UserId, request: TurnRequest) -> Result<TurnReply> {
        let message = request.message.trim().to_string();
        if message.is_empty() {
            return Err(Error::Validation("message must not be empty".into()));
        }

        // Resolve before any write: a foreign or missing conversation fails
        // the whole request here.
        let (conversation, is_new) = match &request.conversation_id {
            Some(id) => (self.loader.authorize(id, caller).await?, false),
            None => (Conversation::new(caller, &message), true),
        };
        let conversation_id = conversation.id.clone();

        // One turn at a time per conversation; other conversations proceed
        // in parallel.
        let lock = self.locks.for_conversation(&conversation_id);
        let _turn = lock.lock().await;

        info!(
            conversation_id = %conversation_id,
            caller = %caller,
            is_new,
            "Handling turn"
        );

        if is_new {
            self.conversations.create(&conversation).await?;
        }

        // The user message is durable before the model is called, exactly
        // once even across client retries.
        let already_stored = match &request.client_message_id {
            Some(key) => self
                .conversations
                .find_client_message(&conversation_id, key)
                .await?
                .is_some(),
            None => false,
        };
        if already_stored {
            debug!(conversation_id = %conversation_id, "Retried message already stored, skipping insert");
        } else {
            let mut row = NewMessage::user(&message);
            if let Some(key) = &request.client_message_id {
                row = row.with_client_message_id(key.clone());
            }
            self.conversations.append(&conversation_id, row).await?;
        }

        // Fresh bounded window. The newest row is the user message, so the
        // rendered history always ends with it.
        let history = self
            .conversations
            .messages(&conversation_id, self.context_limit)
            .await?;

        let mut wire = Vec::with_capacity(history.len() + 2);
        wire.push(ChatMessage::system(self.system_prompt.clone()));
        wire.extend(ContextLoader::to_model_messages(&history));

        let definitions = taskling_tools::definitions();
        let mut executed: Vec<ToolCallRecord> = Vec::new();
        let mut rounds = 0u32;

        let reply = loop {
            let completion = self
                .model
                .complete(CompletionRequest {
                    model: self.model_name.clone(),
                    messages: wire.clone(),
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                    tools: definitions.clone(),
                })
                .await?;

            if !completion.wants_tools() {
                break completion.content;
            }

            rounds += 1;
            if rounds > self.max_tool_rounds {
                warn!(
                    conversation_id = %conversation_id,
                    rounds,
                    "Tool round limit reached, synthesizing fallback reply"
                );
                break ROUND_LIMIT_REPLY.to_string();
            }

            debug!(
                conversation_id = %conversation_id,
                round = rounds,
                calls = completion.tool_calls.len(),
                "Executing tool round"
            );

            wire.push(ChatMessage::assistant_tool_calls(
                completion.tool_calls.clone(),
            ));

            // In model order, synchronously. Business failures are already
            // outcomes; a storage failure is absorbed into an `internal`
            // outcome so the model can tell the user, rather than killing
            // the turn after side effects may have landed.
            for call in completion.tool_calls {
                let arguments: Value = serde_json::from_str(&call.arguments)
                    .unwrap_or_else(|_| Value::String(call.arguments.clone()));

                let outcome = match taskling_tools::invoke(
                    &call.name,
                    &arguments,
                    self.tasks.as_ref(),
                    caller,
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(tool = %call.name, error = %e, "Tool execution hit the store");
                        ToolOutcome::failure(
                            ToolErrorCode::Internal,
                            "the task store is unavailable, try again shortly",
                        )
                    }
                };

                wire.push(ChatMessage::tool_result(
                    call.id.clone(),
                    outcome.to_model_payload(),
                ));
                executed.push(ToolCallRecord {
                    call_id: call.id,
                    name: call.name,
                    arguments,
                    outcome,
                });
            }
        };

        // The stored turn reads user → tool* → assistant.
        for record in executed {
            self.conversations
                .append(&conversation_id, NewMessage::tool(record))
                .await?;
        }
        self.conversations
            .append(&conversation_id, NewMessage::assistant(&reply))
            .await?;

        info!(conversation_id = %conversation_id, "Turn complete");
        Ok(TurnReply {
            conversation_id,
            reply,
        })
    }
}

//! # Taskling Agent
//!
//! The per-turn orchestration loop — the heart of Taskling.
//!
//! Every chat request runs the same stateless cycle:
//!
//! 1. **Resolve** the conversation (create on first message, verify
//!    ownership otherwise)
//! 2. **Load context** fresh from the conversation store (bounded window)
//! 3. **Persist** the user message, durable before the model is called
//! 4. **Model round**: system prompt + history + tool schemas
//! 5. **If tool calls**: execute them against the task store under the
//!    caller's identity, feed results back, loop (bounded rounds)
//! 6. **Persist** the tool records and the assistant reply
//! 7. **Return** the reply
//!
//! Nothing survives between requests: any process instance can serve any
//! conversation on any request.

pub mod context;
pub mod locks;
pub mod orchestrator;

pub use context::ContextLoader;
pub use locks::TurnLocks;
pub use orchestrator::{Orchestrator, TurnReply, TurnRequest, DEFAULT_SYSTEM_PROMPT};

//! # Taskling Core
//!
//! Domain types, traits, and error definitions for the taskling task agent.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The storage and model boundaries are traits here. Implementations live in
//! their respective crates. This enables:
//! - Swapping backends via configuration
//! - Scripted model clients in tests
//! - Clean dependency graph (all crates depend inward on core)

pub mod conversation;
pub mod error;
pub mod model;
pub mod store;
pub mod task;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use conversation::{Conversation, ConversationId, Role, StoredMessage, ToolCallRecord};
pub use error::{Error, ModelError, Result, StoreError};
pub use model::{ChatMessage, Completion, CompletionRequest, ModelClient, ToolCallRequest, Usage};
pub use store::{ConversationStore, NewMessage, NewTask, StatusFilter, TaskPatch, TaskStore};
pub use task::{Priority, Task, UserId};
pub use tool::{ToolDefinition, ToolErrorCode, ToolOutcome};

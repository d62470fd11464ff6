//! # Taskling Model
//!
//! HTTP client for OpenAI-compatible chat completion APIs.
//!
//! Implements the [`ModelClient`] trait from `taskling-core` against any
//! endpoint that speaks the `/chat/completions` wire format (OpenAI,
//! OpenRouter, llama.cpp server, vLLM, LM Studio, and friends).

mod openai_compat;

pub use openai_compat::OpenAiCompatClient;

pub use taskling_core::model::{Completion, CompletionRequest, ModelClient};

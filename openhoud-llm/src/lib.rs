//! # openhoud LLM
//!
//! Chat-completion plumbing for the agent loop.
//!
//! ## Core Concepts
//! - **ChatMessage**: one `system`/`user`/`assistant` turn of a transcript
//! - **LlmProvider**: trait-based model communication, one request per step
//! - **OpenAIProvider**: any OpenAI-compatible endpoint (Ollama, LM Studio, hosted APIs)
//! - **ProviderPreset**: named endpoint defaults, resolved once at startup

pub mod error;
pub mod provider;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, ProviderPreset, ResponseFormat, Role, Usage,
};

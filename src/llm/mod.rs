//! LLM access for the four agent roles.
//!
//! Each role gets its own OpenAI-compatible chat client, built from the
//! role's resolved configuration (endpoint, credential, model, sampling
//! defaults, optional proxy). The [`ChatModel`] trait is the seam mocked
//! in tests; [`with_retries`] bounds transient transport failures.

mod chat;
mod retry;
mod roles;

pub use chat::{ChatClient, ChatModel, ChatRequest, ChatResponse, Choice, Message, Usage};
pub use retry::{with_retries, RetryPolicy};
pub use roles::RoleModels;

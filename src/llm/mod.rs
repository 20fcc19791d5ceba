//! LLM client layer
//!
//! A single async trait, [`LlmClient`], fronts every model call. Concrete
//! pieces:
//! - `OpenAiClient`: OpenAI-compatible `/chat/completions` over HTTP
//! - `RetryingClient`: retries transient failures with exponential backoff
//! - `ScriptedClient`: deterministic replies for tests and dry runs
//!
//! `extract_json` recovers structured data from free-form model replies.

mod json;
mod mock;
mod openai;
mod retry;
mod types;

pub use json::extract_json;
pub use mock::ScriptedClient;
pub use openai::{OpenAiClient, DEFAULT_BASE_URL};
pub use retry::{RetryPolicy, RetryingClient};
pub use types::{CompletionParams, LlmClient, LlmError};

//! Scripted client for tests and offline runs

use super::types::{CompletionParams, LlmClient, LlmError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

/// Client that replays scripted replies and counts calls.
///
/// Queued replies are consumed first, in order. Once the queue is empty the
/// responder (if any) computes a reply from the prompt; without one, calls
/// fail with `InvalidRequest`.
pub struct ScriptedClient {
    queue: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Client whose replies are computed from the prompt.
    pub fn responding_with<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Queue a successful reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, item: Result<String, LlmError>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(item);
    }

    /// Number of `complete` calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(
        &self,
        prompt: &str,
        _model: &str,
        _params: &CompletionParams,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let queued = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match (queued, &self.responder) {
            (Some(item), _) => item,
            (None, Some(responder)) => responder(prompt),
            (None, None) => Err(LlmError::InvalidRequest(
                "no scripted reply left".to_string(),
            )),
        }
    }
}

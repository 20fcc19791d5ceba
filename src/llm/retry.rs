//! Bounded retry with exponential backoff

use super::types::{CompletionParams, LlmClient, LlmError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// How many times, and how patiently, transient failures are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Retry `max_retries` times without sleeping. Intended for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(32) as i32);
        let secs = self.initial_backoff.as_secs_f64() * factor;
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }
}

/// Wraps a client and retries transient failures per a [`RetryPolicy`].
///
/// Permanent failures (authentication, quota, invalid request, unknown
/// model) and parse errors are returned on the first occurrence.
pub struct RetryingClient {
    inner: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl LlmClient for RetryingClient {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        params: &CompletionParams,
    ) -> Result<String, LlmError> {
        let mut retry = 0;
        loop {
            match self.inner.complete(prompt, model, params).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() && retry < self.policy.max_retries => {
                    let delay = self.policy.backoff_for(retry);
                    warn!(
                        error = %e,
                        attempt = retry + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "transient LLM failure, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedClient;

    fn server_error() -> LlmError {
        LlmError::Server {
            status: 502,
            message: "bad gateway".into(),
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            multiplier: 2.0,
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn transient_failure_then_success_matches_first_try() {
        let flaky = Arc::new(
            ScriptedClient::new()
                .with_error(server_error())
                .with_error(LlmError::Timeout("slow".into()))
                .with_reply("answer"),
        );
        let retrying = RetryingClient::new(flaky.clone(), RetryPolicy::immediate(3));
        let flaky_result = retrying
            .complete("q", "m", &CompletionParams::default())
            .await;

        let steady = Arc::new(ScriptedClient::new().with_reply("answer"));
        let retrying = RetryingClient::new(steady.clone(), RetryPolicy::immediate(3));
        let steady_result = retrying
            .complete("q", "m", &CompletionParams::default())
            .await;

        assert_eq!(flaky_result, steady_result);
        assert_eq!(flaky.call_count(), 3);
        assert_eq!(steady.call_count(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_bound() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_error(server_error())
                .with_error(server_error())
                .with_error(server_error())
                .with_reply("too late"),
        );
        let retrying = RetryingClient::new(client.clone(), RetryPolicy::immediate(2));
        let err = retrying
            .complete("q", "m", &CompletionParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Server { .. }));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_error(LlmError::Authentication("bad key".into()))
                .with_reply("unreachable"),
        );
        let retrying = RetryingClient::new(client.clone(), RetryPolicy::immediate(5));
        let err = retrying
            .complete("q", "m", &CompletionParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Authentication(_)));
        assert_eq!(client.call_count(), 1);
    }
}

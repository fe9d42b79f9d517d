use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{Completion, ModelError, TextModel};

/// Narrative sentence returned when every attempt fails
pub const FALLBACK_TEXT: &str =
    "The story pauses for a moment, as if the storyteller is gathering their thoughts...";

/// Retry and sampling settings for a `ModelClient`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    /// Pause between a failed attempt and the next one
    pub delay: Duration,
    /// Default creativity parameter
    pub temperature: f32,
    /// Text returned on exhaustion
    pub fallback_text: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            temperature: 0.7,
            fallback_text: FALLBACK_TEXT.to_string(),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = text.into();
        self
    }
}

/// Runs prompts against a `TextModel` with bounded retry.
///
/// Never fails: on exhaustion the policy's fallback text comes back with
/// `Completion::fallback` set.
#[derive(Clone)]
pub struct ModelClient {
    model: Arc<dyn TextModel>,
    policy: RetryPolicy,
}

impl ModelClient {
    pub fn new(model: Arc<dyn TextModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Run a prompt at the policy's default temperature
    pub async fn generate(&self, prompt: &str) -> Completion {
        self.generate_with_temperature(prompt, self.policy.temperature)
            .await
    }

    pub async fn generate_with_temperature(&self, prompt: &str, temperature: f32) -> Completion {
        let start = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            debug!(
                model = self.model.model_id(),
                attempt = attempts,
                max_attempts,
                prompt_len = prompt.len(),
                "Invoking model"
            );

            let error = match self.model.complete(prompt, temperature).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        attempt = attempts,
                        response_len = text.len(),
                        duration_ms = start.elapsed().as_millis(),
                        "Model call succeeded"
                    );
                    return Completion::new(text.trim().to_string(), attempts, start.elapsed());
                }
                Ok(_) => ModelError::EmptyResponse,
                Err(e) => e,
            };

            warn!(
                attempt = attempts,
                max_attempts,
                error = %error,
                "Model call failed"
            );

            if !error.is_transient() {
                break;
            }

            if attempts < max_attempts && !self.policy.delay.is_zero() {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        warn!(attempts, "Model attempts exhausted, returning fallback text");
        Completion::fallback(self.policy.fallback_text.clone(), attempts, start.elapsed())
    }
}

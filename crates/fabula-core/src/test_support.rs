//! Scripted model stand-ins for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fabula_model::{ModelClient, ModelError, RetryPolicy, TextModel};

use crate::storyteller::{StoryConfig, Storyteller};

pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    repeat: Option<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedModel {
    /// Answers every prompt with `reply`
    pub fn always(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            repeat: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    /// Answers with `replies` in order, then fails
    pub fn sequence(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            repeat: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    /// Answers every prompt with `reply` after sleeping for `delay`
    pub fn slow(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            repeat: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn failing() -> Arc<Self> {
        Self::sequence(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return Ok(reply);
        }
        self.repeat
            .clone()
            .ok_or_else(|| ModelError::Transport("service unavailable".into()))
    }
}

pub fn storyteller_with(model: Arc<ScriptedModel>, config: StoryConfig) -> Storyteller {
    let policy = RetryPolicy::default()
        .with_max_attempts(2)
        .with_delay(Duration::ZERO);
    Storyteller::new(ModelClient::new(model, policy), config)
}

pub fn storyteller(model: Arc<ScriptedModel>) -> Storyteller {
    storyteller_with(model, StoryConfig::default())
}

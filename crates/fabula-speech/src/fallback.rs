use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{Audio, SpeechError, SpeechSynthesizer};

/// Tries each backend in priority order and returns the first audio produced.
pub struct FallbackSynthesizer {
    backends: Vec<Arc<dyn SpeechSynthesizer>>,
}

impl FallbackSynthesizer {
    pub fn new(backends: Vec<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self { backends }
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for FallbackSynthesizer {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn synthesize(&self, text: &str, speed: f32) -> Result<Audio, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        if self.backends.is_empty() {
            return Err(SpeechError::NoBackends);
        }

        let mut failures = Vec::new();
        for backend in &self.backends {
            debug!(backend = backend.name(), text_len = text.len(), "Synthesizing speech");
            match backend.synthesize(text, speed).await {
                Ok(audio) => return Ok(audio),
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Speech backend failed");
                    failures.push(e.to_string());
                }
            }
        }

        Err(SpeechError::Exhausted(failures.join("; ")))
    }
}

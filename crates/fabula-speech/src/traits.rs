use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Nothing to synthesize")]
    EmptyText,

    #[error("{backend} is not available: {message}")]
    Unavailable {
        backend: &'static str,
        message: String,
    },

    #[error("{backend} failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("No speech backends configured")]
    NoBackends,

    #[error("All speech backends failed: {0}")]
    Exhausted(String),
}

impl SpeechError {
    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        SpeechError::Backend {
            backend,
            message: message.into(),
        }
    }
}

/// Encoded audio for one piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Audio {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    /// Name of the backend that produced it
    pub backend: String,
}

/// Text to audio bytes, given a speed factor (1.0 is normal speed)
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str, speed: f32) -> Result<Audio, SpeechError>;
}

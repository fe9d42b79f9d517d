use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a single model call
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to reach model service: {0}")]
    Transport(String),

    #[error("Model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model service rate limited the request: {0}")]
    RateLimited(String),

    #[error("Model service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Failed to decode model response: {0}")]
    MalformedResponse(String),

    #[error("Model configuration error: {0}")]
    ConfigError(String),
}

impl ModelError {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, ModelError::ConfigError(_))
    }
}

/// Supported model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    Gemini,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(ModelType::Gemini),
            _ => Err(format!("Unknown model backend: {}", s)),
        }
    }
}

/// The core abstraction over a generative text-completion service
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Human-readable name of the backend (e.g., "Gemini")
    fn name(&self) -> &str;

    /// The model identifier sent to the service
    fn model_id(&self) -> &str;

    /// Run one completion. No retries happen at this level.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, ModelError>;
}

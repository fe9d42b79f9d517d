//! # fabula-model
//!
//! Invocation of the external generative text service.
//!
//! - [`TextModel`] - one completion call against a backend, no retries
//! - [`GeminiModel`] - Gemini `generateContent` over HTTP
//! - [`ModelClient`] - bounded retry with a fallback literal on exhaustion

mod client;
mod completion;
mod gemini;
mod traits;

pub use client::{ModelClient, RetryPolicy, FALLBACK_TEXT};
pub use completion::Completion;
pub use gemini::GeminiModel;
pub use traits::{ModelError, ModelType, TextModel};

use std::sync::Arc;

/// Create a model backend by type
pub fn create_model(model_type: ModelType, api_key: &str, model_id: &str) -> Arc<dyn TextModel> {
    match model_type {
        ModelType::Gemini => Arc::new(GeminiModel::new(api_key, model_id)),
    }
}

use std::time::Duration;

/// Text produced by one `ModelClient` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Trimmed model text, or the fallback literal
    pub text: String,
    /// Number of attempts made against the service
    pub attempts: usize,
    /// True when every attempt failed and `text` is the fallback literal
    pub fallback: bool,
    /// Wall time across all attempts, including retry delays
    pub duration: Duration,
}

impl Completion {
    pub fn new(text: String, attempts: usize, duration: Duration) -> Self {
        Self {
            text,
            attempts,
            fallback: false,
            duration,
        }
    }

    pub fn fallback(text: String, attempts: usize, duration: Duration) -> Self {
        Self {
            text,
            attempts,
            fallback: true,
            duration,
        }
    }

    /// The model text, or `None` if the call degraded to the fallback literal
    pub fn model_text(&self) -> Option<&str> {
        if self.fallback {
            None
        } else {
            Some(&self.text)
        }
    }
}

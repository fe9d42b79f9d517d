use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use fabula_narrative::clean_narrative;
use fabula_speech::SpeechSynthesizer;

use super::{body, success, ApiError, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: String,
    pub speed: Option<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    /// Base64 encoded audio
    pub audio: String,
    pub mime_type: &'static str,
    pub backend: String,
}

pub async fn synthesize(
    State(state): State<AppState>,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> ApiResult<SpeechResponse> {
    let req = body(payload)?;
    let text = clean_narrative(&req.text);
    if text.is_empty() {
        return Err(ApiError::soft("Missing required field: text"));
    }

    let speed = req
        .speed
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(state.config.speech_speed);

    let audio = state.speech.synthesize(&text, speed).await.map_err(|e| {
        warn!(error = %e, "Speech synthesis failed");
        ApiError::soft(format!("Speech synthesis failed: {}", e))
    })?;

    info!(backend = %audio.backend, bytes = audio.bytes.len(), "Speech synthesized");
    Ok(success(SpeechResponse {
        audio: STANDARD.encode(&audio.bytes),
        mime_type: audio.mime_type,
        backend: audio.backend,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{render, state_with};
    use axum::http::StatusCode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_blank_text_is_soft_failure() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, &[]);
        let req = SpeechRequest {
            text: "  **  ".to_string(),
            speed: None,
        };

        let (status, json) = render(synthesize(State(state), Ok(Json(req))).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("text"));
    }

    #[tokio::test]
    async fn test_no_backends_is_soft_failure() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, &[]);
        let req = SpeechRequest {
            text: "The night was quiet.".to_string(),
            speed: Some(1.0),
        };

        let (status, json) = render(synthesize(State(state), Ok(Json(req))).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("Speech synthesis failed"));
    }
}

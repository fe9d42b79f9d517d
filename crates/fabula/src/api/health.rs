use axum::extract::State;
use serde::Serialize;

use fabula_narrative::Genre;

use super::{success, ApiResult, AppState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub model_configured: bool,
    pub genres: Vec<String>,
    pub speech_backends: Vec<String>,
}

pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    Ok(success(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.storyteller.client().model_id().to_string(),
        model_configured: state.config.api_key.is_some(),
        genres: Genre::ALL.iter().map(|g| g.to_string()).collect(),
        speech_backends: state
            .speech
            .backend_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{render, state_with};
    use axum::http::StatusCode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_health_lists_genres() {
        let dir = TempDir::new().unwrap();
        let (status, json) = render(health(State(state_with(&dir, &[]))).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "queue-1");
        assert_eq!(json["genres"].as_array().unwrap().len(), 8);
        assert_eq!(json["genres"][1], "sci-fi");
    }
}

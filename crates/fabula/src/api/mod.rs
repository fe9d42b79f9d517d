//! # HTTP API
//!
//! JSON endpoints for the narrative operations, stored stories, reader
//! sessions and speech. Bodies use camelCase keys.
//!
//! Every response is a JSON object. Successful ones carry `"success": true`
//! next to their payload. Problems a reader can fix (a missing field, an
//! unknown genre, a story that already ended) come back as HTTP 200 with
//! `"success": false` and a message; missing records are 404 and storage
//! faults are 500, with the same body shape.

mod health;
mod sessions;
mod speech;
mod stories;
mod story;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use fabula_core::{NarrativeError, SessionRegistry, Storyteller};
use fabula_speech::FallbackSynthesizer;
use fabula_stories::{StoreError, Story, StoryStore};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub storyteller: Arc<Storyteller>,
    pub store: Arc<StoryStore>,
    pub sessions: Arc<SessionRegistry>,
    pub speech: Arc<FallbackSynthesizer>,
    pub config: Arc<AppConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/story/starters", post(story::starters))
        .route("/api/story/custom-starter", post(story::custom_starter))
        .route("/api/story/choices", post(story::choices))
        .route("/api/story/continue", post(story::continue_story))
        .route("/api/story/ending", post(story::ending))
        .route("/api/story/recap", post(story::recap))
        .route(
            "/api/stories",
            get(stories::list_stories).post(stories::save_story),
        )
        .route(
            "/api/stories/{id}",
            get(stories::get_story).delete(stories::delete_story),
        )
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/{id}", get(sessions::get_session))
        .route("/api/sessions/{id}/begin", post(sessions::begin))
        .route("/api/sessions/{id}/next", post(sessions::next))
        .route("/api/sessions/{id}/end", post(sessions::end))
        .route("/api/speech", post(speech::synthesize))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Response envelope
// ============================================================================

/// Successful response: `{"success": true, ...payload}`
#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    data: T,
}

pub fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

pub type ApiResult<T> = Result<Json<Success<T>>, ApiError>;

/// Failure response: `{"success": false, "message": ...}` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// A problem the caller can fix; still HTTP 200
    pub fn soft(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct FailureBody<'a> {
    success: bool,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = FailureBody {
            success: false,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidId(id) => ApiError::not_found(format!("Story {} not found", id)),
            other => {
                error!(error = %other, "Story store failure");
                ApiError::internal(other.to_string())
            }
        }
    }
}

impl From<NarrativeError> for ApiError {
    fn from(e: NarrativeError) -> Self {
        match e {
            NarrativeError::Store(store) => store.into(),
            other => ApiError::soft(other.to_string()),
        }
    }
}

/// Unwrap a JSON body, turning a malformed one into a JSON 400
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: rejection.body_text(),
    })
}

// ============================================================================
// Shared payloads
// ============================================================================

/// A stored story with its derived full text
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    #[serde(flatten)]
    pub story: Story,
    pub full_story: String,
}

impl From<Story> for StoryView {
    fn from(story: Story) -> Self {
        let full_story = story.full_text();
        Self { story, full_story }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::response::IntoResponse;
    use fabula_core::StoryConfig;
    use fabula_model::{ModelClient, ModelError, RetryPolicy, TextModel};
    use tempfile::TempDir;

    use super::*;

    /// Replies in order, then fails every call
    pub struct QueueModel {
        replies: Mutex<VecDeque<String>>,
    }

    impl QueueModel {
        pub fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl TextModel for QueueModel {
        fn name(&self) -> &str {
            "Queue"
        }

        fn model_id(&self) -> &str {
            "queue-1"
        }

        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, ModelError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::Transport("no more replies".into()))
        }
    }

    pub fn state_with(dir: &TempDir, replies: &[&str]) -> AppState {
        let policy = RetryPolicy::default()
            .with_max_attempts(1)
            .with_delay(Duration::ZERO);
        let client = ModelClient::new(QueueModel::new(replies), policy);
        AppState {
            storyteller: Arc::new(Storyteller::new(client, StoryConfig::default())),
            store: Arc::new(StoryStore::with_dir(dir.path().join("stories"))),
            sessions: Arc::new(SessionRegistry::default()),
            speech: Arc::new(FallbackSynthesizer::new(Vec::new())),
            config: Arc::new(AppConfig::default()),
        }
    }

    /// Render a handler result to (status, JSON body)
    pub async fn render<T: Serialize>(result: ApiResult<T>) -> (StatusCode, serde_json::Value) {
        let response = match result {
            Ok(json) => json.into_response(),
            Err(e) => e.into_response(),
        };
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

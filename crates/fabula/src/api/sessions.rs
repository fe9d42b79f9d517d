//! Server-held reader sessions: the draft story lives here between requests.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use fabula_core::{SessionSnapshot, StorySession, StoryStart};
use fabula_narrative::Genre;

use super::{body, success, ApiError, ApiResult, AppState, StoryView};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRequest {
    #[serde(default)]
    pub starter: String,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub character_name: Option<String>,
    pub character_trait: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRequest {
    #[serde(default)]
    pub chosen_action: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub session_id: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session: SessionSnapshot,
}

#[derive(Serialize)]
pub struct BeginResponse {
    pub story: StoryView,
    pub choices: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextResponse {
    pub next_part: String,
    pub choices: Vec<String>,
    pub limit_reached: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndResponse {
    pub ending: String,
    pub story_id: String,
    pub recap: String,
}

async fn lookup(state: &AppState, id: &str) -> Result<Arc<Mutex<StorySession>>, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Session {} not found", id)))
}

pub async fn create_session(State(state): State<AppState>) -> ApiResult<CreatedResponse> {
    let session_id = state.sessions.create().await;
    Ok(success(CreatedResponse { session_id }))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = lookup(&state, &id).await?;
    let session = session.lock().await.snapshot().await;
    Ok(success(SessionResponse { session }))
}

pub async fn begin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<BeginRequest>, JsonRejection>,
) -> ApiResult<BeginResponse> {
    let req = body(payload)?;
    let session = lookup(&state, &id).await?;

    let start = StoryStart {
        starter: req.starter,
        title: req.title,
        genre: Genre::parse_lenient(req.genre.as_deref()),
        character_name: req.character_name,
        character_trait: req.character_trait,
    };
    let begun = session.lock().await.begin(&state.storyteller, start).await?;

    Ok(success(BeginResponse {
        story: begun.story.into(),
        choices: begun.choices,
    }))
}

pub async fn next(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NextRequest>, JsonRejection>,
) -> ApiResult<NextResponse> {
    let req = body(payload)?;
    let action = req.chosen_action.trim();
    if action.is_empty() {
        return Err(ApiError::soft("Missing required field: chosenAction"));
    }

    let session = lookup(&state, &id).await?;
    let advanced = session
        .lock()
        .await
        .advance(&state.storyteller, action)
        .await?;

    Ok(success(NextResponse {
        next_part: advanced.next_part,
        choices: advanced.choices,
        limit_reached: advanced.limit_reached,
    }))
}

pub async fn end(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<EndResponse> {
    let session = lookup(&state, &id).await?;
    let finished = session
        .lock()
        .await
        .finish(&state.storyteller, &state.store)
        .await?;

    Ok(success(EndResponse {
        ending: finished.ending,
        story_id: finished.story_id,
        recap: finished.recap,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{render, state_with};
    use axum::http::StatusCode;
    use tempfile::TempDir;

    async fn new_session(state: &AppState) -> String {
        let (_, json) = render(create_session(State(state.clone())).await).await;
        json["sessionId"].as_str().unwrap().to_string()
    }

    fn begin_request(starter: &str) -> BeginRequest {
        BeginRequest {
            starter: starter.to_string(),
            title: Some("Lantern".to_string()),
            genre: Some("horror".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_session_flow_persists_story() {
        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            &[
                r#"["Light the lantern", "Run", "Hide"]"#,
                "The flame caught and shadows fled.",
                r#"["Follow the stairs", "Go back", "Listen"]"#,
                "Dawn broke over the empty house.",
                "You lit a lantern and survived the night.",
            ],
        );
        let id = new_session(&state).await;

        let (status, json) = render(
            begin(
                State(state.clone()),
                Path(id.clone()),
                Ok(Json(begin_request("The power failed."))),
            )
            .await,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["story"]["title"], "Lantern");
        assert_eq!(json["story"]["fullStory"], "The power failed.");
        assert_eq!(json["choices"].as_array().unwrap().len(), 3);

        let next_req = NextRequest {
            chosen_action: "Light the lantern".to_string(),
        };
        let (_, json) =
            render(next(State(state.clone()), Path(id.clone()), Ok(Json(next_req))).await).await;
        assert_eq!(json["nextPart"], "The flame caught and shadows fled.");
        assert_eq!(json["limitReached"], false);

        let (status, json) = render(end(State(state.clone()), Path(id.clone())).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ending"], "Dawn broke over the empty house.");
        assert_eq!(json["recap"], "You lit a lantern and survived the night.");

        let story_id = json["storyId"].as_str().unwrap();
        let saved = state.store.get(story_id).unwrap().unwrap();
        assert!(saved.is_ended());
        assert_eq!(saved.genre.as_deref(), Some("horror"));

        let (_, json) = render(get_session(State(state), Path(id)).await).await;
        assert!(json["session"]["draft"].is_null());
        assert_eq!(json["session"]["recent"][0]["id"], story_id);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, &[]);

        let (status, json) =
            render(get_session(State(state.clone()), Path("nope".to_string())).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);

        let (status, _) = render(end(State(state), Path("nope".to_string())).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_next_without_story_is_soft_failure() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, &[]);
        let id = new_session(&state).await;

        let next_req = NextRequest {
            chosen_action: "run".to_string(),
        };
        let (status, json) = render(next(State(state), Path(id), Ok(Json(next_req))).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_next_requires_action() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, &[]);
        let id = new_session(&state).await;

        let (_, json) = render(
            next(State(state), Path(id), Ok(Json(NextRequest::default()))).await,
        )
        .await;

        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("chosenAction"));
    }

    #[tokio::test]
    async fn test_begin_degrades_to_placeholder_choices() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, &[]);
        let id = new_session(&state).await;

        let (status, json) = render(
            begin(State(state), Path(id), Ok(Json(begin_request("Rain fell.")))).await,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["choices"].as_array().unwrap().len(), 3);
    }
}

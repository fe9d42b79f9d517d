use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use fabula_narrative::Genre;
use fabula_stories::Story;

use super::{body, success, ApiError, ApiResult, AppState, StoryView};

const DEFAULT_TITLE: &str = "Untitled Story";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStoryRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub story_parts: Vec<String>,
    #[serde(default)]
    pub ended: bool,
    pub genre: Option<String>,
    pub character_name: Option<String>,
    pub character_trait: Option<String>,
    #[serde(default)]
    pub choices_made: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStoryResponse {
    pub story_id: String,
}

#[derive(Serialize)]
pub struct StoriesResponse {
    pub stories: Vec<StoryView>,
}

#[derive(Serialize)]
pub struct StoryResponse {
    pub story: StoryView,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

pub async fn save_story(
    State(state): State<AppState>,
    payload: Result<Json<SaveStoryRequest>, JsonRejection>,
) -> ApiResult<SaveStoryResponse> {
    let req = body(payload)?;

    let parts: Vec<String> = req
        .story_parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(ApiError::soft("Missing required field: storyParts"));
    }

    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let mut story = Story::from_parts(title, parts, req.ended);
    story.genre = Genre::parse_lenient(req.genre.as_deref()).map(|g| g.to_string());
    story.character_name = req.character_name;
    story.character_trait = req.character_trait;
    story.choices_made = req.choices_made;

    let story_id = state.store.save(&story)?;
    info!(story_id = %story_id, parts = story.len(), "Story saved");
    Ok(success(SaveStoryResponse { story_id }))
}

pub async fn list_stories(State(state): State<AppState>) -> ApiResult<StoriesResponse> {
    let stories = state.store.list()?.into_iter().map(StoryView::from).collect();
    Ok(success(StoriesResponse { stories }))
}

pub async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StoryResponse> {
    let story = state
        .store
        .get(&id)?
        .ok_or_else(|| ApiError::not_found(format!("Story {} not found", id)))?;
    Ok(success(StoryResponse {
        story: story.into(),
    }))
}

/// Absent stories report `deleted: false` rather than an error
pub async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResponse> {
    let deleted = state.store.delete(&id)?;
    let forgotten = state.sessions.forget_story(&id).await;
    info!(story_id = %id, deleted, sessions = forgotten, "Story delete requested");
    Ok(success(DeleteResponse { deleted }))
}

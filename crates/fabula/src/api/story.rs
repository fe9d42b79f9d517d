//! Stateless narrative operations. The client holds the story and sends
//! whatever context each operation needs.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use fabula_core::NarrativeError;
use fabula_narrative::{Genre, NarrativeRequest};

use super::{body, success, ApiResult, AppState};

// ============================================================================
// Types
// ============================================================================

/// Fields shared by the narrative operations
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryParams {
    pub genre: Option<String>,
    pub character_name: Option<String>,
    pub character_trait: Option<String>,
    #[serde(default)]
    pub story_so_far: String,
    pub chosen_action: Option<String>,
    pub num_choices: Option<usize>,
}

impl StoryParams {
    /// Unknown genres are ignored
    fn into_request(self) -> NarrativeRequest {
        let genre = Genre::parse_lenient(self.genre.as_deref());
        self.into_request_with(genre)
    }

    /// Unknown genres are an error; blank means none
    fn into_strict_request(self) -> Result<NarrativeRequest, NarrativeError> {
        let genre = self
            .genre
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::parse::<Genre>)
            .transpose()?;
        Ok(self.into_request_with(genre))
    }

    fn into_request_with(self, genre: Option<Genre>) -> NarrativeRequest {
        NarrativeRequest {
            genre,
            character_name: self.character_name,
            character_trait: self.character_trait,
            story_so_far: self.story_so_far,
            chosen_action: self.chosen_action,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CustomStarterRequest {
    #[serde(default)]
    pub idea: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapRequest {
    #[serde(default)]
    pub choices_made: Vec<String>,
    pub genre: Option<String>,
    pub character_name: Option<String>,
}

#[derive(Serialize)]
pub struct StartersResponse {
    pub starters: Vec<String>,
}

#[derive(Serialize)]
pub struct StarterResponse {
    pub starter: String,
}

#[derive(Serialize)]
pub struct ChoicesResponse {
    pub choices: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPartResponse {
    pub next_part: String,
}

#[derive(Serialize)]
pub struct EndingResponse {
    pub ending: String,
}

#[derive(Serialize)]
pub struct RecapResponse {
    pub recap: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn starters(
    State(state): State<AppState>,
    payload: Result<Json<StoryParams>, JsonRejection>,
) -> ApiResult<StartersResponse> {
    let request = body(payload)?.into_strict_request()?;
    let starters = state.storyteller.starters(&request).await.into_value();
    Ok(success(StartersResponse { starters }))
}

pub async fn custom_starter(
    State(state): State<AppState>,
    payload: Result<Json<CustomStarterRequest>, JsonRejection>,
) -> ApiResult<StarterResponse> {
    let idea = body(payload)?.idea;
    let starter = state.storyteller.custom_starter(&idea).await?.into_value();
    Ok(success(StarterResponse { starter }))
}

pub async fn choices(
    State(state): State<AppState>,
    payload: Result<Json<StoryParams>, JsonRejection>,
) -> ApiResult<ChoicesResponse> {
    let params = body(payload)?;
    let count = params.num_choices;
    let request = params.into_request();
    let choices = state
        .storyteller
        .choices(&request, count)
        .await?
        .into_value();
    Ok(success(ChoicesResponse { choices }))
}

pub async fn continue_story(
    State(state): State<AppState>,
    payload: Result<Json<StoryParams>, JsonRejection>,
) -> ApiResult<NextPartResponse> {
    let request = body(payload)?.into_request();
    let next_part = state
        .storyteller
        .continue_story(&request)
        .await?
        .into_value();
    Ok(success(NextPartResponse { next_part }))
}

pub async fn ending(
    State(state): State<AppState>,
    payload: Result<Json<StoryParams>, JsonRejection>,
) -> ApiResult<EndingResponse> {
    let request = body(payload)?.into_request();
    let ending = state.storyteller.ending(&request).await?.into_value();
    Ok(success(EndingResponse { ending }))
}

pub async fn recap(
    State(state): State<AppState>,
    payload: Result<Json<RecapRequest>, JsonRejection>,
) -> ApiResult<RecapResponse> {
    let req = body(payload)?;
    let genre = Genre::parse_lenient(req.genre.as_deref());
    let recap = state
        .storyteller
        .recap(&req.choices_made, genre, req.character_name.as_deref())
        .await
        .into_value();
    Ok(success(RecapResponse { recap }))
}

use tracing::{debug, info, warn};

use fabula_model::ModelClient;
use fabula_narrative::{
    clean_narrative, fit_to_count, normalize_list_for, normalize_prose, Genre, NarrativePrompts,
    NarrativeRequest,
};

use crate::error::NarrativeError;
use crate::outcome::Generated;
use crate::placeholders;

/// Knobs for the narrative operations
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Parts a session story may hold before it must be ended
    pub max_story_parts: usize,
    pub starter_count: usize,
    pub default_choice_count: usize,
    /// Upper bound on client-requested choice counts
    pub max_choice_count: usize,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            max_story_parts: 10,
            starter_count: 3,
            default_choice_count: 3,
            max_choice_count: 10,
        }
    }
}

impl StoryConfig {
    pub fn with_max_story_parts(mut self, max: usize) -> Self {
        self.max_story_parts = max.max(1);
        self
    }

    /// Clamp a requested choice count into `1..=max_choice_count`
    pub fn choice_count(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_choice_count)
            .clamp(1, self.max_choice_count.max(1))
    }
}

/// Runs the narrative operations: prompt, model call, normalization, placeholders.
#[derive(Clone)]
pub struct Storyteller {
    client: ModelClient,
    config: StoryConfig,
}

impl Storyteller {
    pub fn new(client: ModelClient, config: StoryConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn client(&self) -> &ModelClient {
        &self.client
    }

    /// Opening scenarios, always exactly `starter_count` of them
    pub async fn starters(&self, request: &NarrativeRequest) -> Generated<Vec<String>> {
        let count = self.config.starter_count;
        let prompt = NarrativePrompts::build_starters_prompt(request, count);
        let genre = request.genre;
        self.list("starters", &prompt, count, |i| placeholders::starter(genre, i))
            .await
    }

    /// One opening paragraph from the reader's own idea
    pub async fn custom_starter(&self, idea: &str) -> Result<Generated<String>, NarrativeError> {
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(NarrativeError::MissingField("idea"));
        }
        let prompt = NarrativePrompts::build_custom_starter_prompt(idea);
        Ok(self
            .prose("custom_starter", &prompt, || placeholders::custom_starter(idea))
            .await)
    }

    /// Options for what the main character does next
    pub async fn choices(
        &self,
        request: &NarrativeRequest,
        count: Option<usize>,
    ) -> Result<Generated<Vec<String>>, NarrativeError> {
        require_story(request)?;
        let count = self.config.choice_count(count);
        let prompt = NarrativePrompts::build_choices_prompt(request, count);
        Ok(self.list("choices", &prompt, count, placeholders::choice).await)
    }

    /// The next paragraph, following the reader's chosen action
    pub async fn continue_story(
        &self,
        request: &NarrativeRequest,
    ) -> Result<Generated<String>, NarrativeError> {
        require_story(request)?;
        let action = request
            .chosen_action()
            .ok_or(NarrativeError::MissingField("chosenAction"))?;
        let prompt = NarrativePrompts::build_continuation_prompt(request);
        Ok(self
            .prose("continue", &prompt, || placeholders::continuation(action))
            .await)
    }

    pub async fn ending(&self, request: &NarrativeRequest) -> Result<Generated<String>, NarrativeError> {
        require_story(request)?;
        let prompt = NarrativePrompts::build_ending_prompt(request);
        Ok(self
            .prose("ending", &prompt, || placeholders::ENDING.to_string())
            .await)
    }

    /// Short summary of the path taken. Empty, without a model call, when no choices were made.
    pub async fn recap(
        &self,
        choices_made: &[String],
        genre: Option<Genre>,
        character_name: Option<&str>,
    ) -> Generated<String> {
        let made = choices_made.iter().filter(|c| !c.trim().is_empty()).count();
        if made == 0 {
            return Generated::model(String::new(), 0);
        }
        let prompt = NarrativePrompts::build_recap_prompt(choices_made, genre, character_name);
        self.prose("recap", &prompt, || placeholders::recap(made)).await
    }

    async fn list(
        &self,
        operation: &str,
        prompt: &str,
        count: usize,
        placeholder: impl Fn(usize) -> String,
    ) -> Generated<Vec<String>> {
        let completion = self.client.generate(prompt).await;
        let recovered: Vec<String> = completion
            .model_text()
            .map(|text| normalize_list_for(text, count))
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        let usable = recovered.len().min(count);
        let items = fit_to_count(recovered, count, placeholder);

        if usable == count {
            debug!(operation, count, "List generated");
            Generated::model(items, completion.attempts)
        } else if usable == 0 {
            warn!(operation, count, "No usable items from model, using placeholders");
            Generated::fallback(items, completion.attempts)
        } else {
            info!(operation, usable, count, "Padded model list with placeholders");
            Generated::padded(items, completion.attempts)
        }
    }

    async fn prose(
        &self,
        operation: &str,
        prompt: &str,
        fallback: impl FnOnce() -> String,
    ) -> Generated<String> {
        let completion = self.client.generate(prompt).await;
        match completion
            .model_text()
            .map(normalize_prose)
            .filter(|text| !text.is_empty())
        {
            Some(text) => {
                debug!(operation, len = text.len(), "Prose generated");
                Generated::model(text, completion.attempts)
            }
            None => {
                warn!(operation, "No usable prose from model, using fallback");
                Generated::fallback(clean_narrative(&fallback()), completion.attempts)
            }
        }
    }
}

fn require_story(request: &NarrativeRequest) -> Result<(), NarrativeError> {
    request
        .story_so_far()
        .map(|_| ())
        .ok_or(NarrativeError::MissingField("storySoFar"))
}

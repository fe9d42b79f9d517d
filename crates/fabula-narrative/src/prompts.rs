use crate::request::{non_blank, Genre, NarrativeRequest};

/// Prompt templates for the narrative operations
pub struct NarrativePrompts;

const PROSE_ONLY: &str = "Do not list, number or label any choices or options, and do not end with a question to the reader such as \"What will you do?\" or \"What happens next?\".";

impl NarrativePrompts {
    /// Build the prompt asking for `count` opening scenarios
    pub fn build_starters_prompt(request: &NarrativeRequest, count: usize) -> String {
        let mut lines = vec![format!(
            "Generate {} unique and engaging story starters (2-3 sentences each) for {}.",
            count,
            story_noun(request.genre)
        )];
        lines.push(
            "Each starter should set up an interesting scenario that could lead to an interactive story."
                .to_string(),
        );
        lines.extend(character_lines(request));
        lines.push(list_format_instruction(count));
        lines.join("\n")
    }

    /// Build the prompt for an opening paragraph based on a reader's own idea
    pub fn build_custom_starter_prompt(idea: &str) -> String {
        [
            format!(
                "Generate an engaging opening paragraph (2-3 sentences) for a story based on this idea: \"{}\".",
                idea.trim()
            ),
            "The paragraph should set up the scenario in an interesting way that can lead to an interactive story.".to_string(),
            "Provide only the paragraph with no additional text or explanation.".to_string(),
        ]
        .join("\n")
    }

    /// Build the prompt asking for `count` short options for what happens next
    pub fn build_choices_prompt(request: &NarrativeRequest, count: usize) -> String {
        let mut lines = story_block(request, "Here's a story in progress:");
        lines.extend(genre_line(request.genre));
        lines.extend(character_lines(request));
        lines.push(format!(
            "Generate {} distinct and interesting options for what the main character could do next in this story.",
            count
        ));
        lines.push(
            "Each option should be a brief phrase (5-10 words) that presents a clear direction."
                .to_string(),
        );
        lines.push(list_format_instruction(count));
        lines.join("\n")
    }

    /// Build the prompt continuing the story from the reader's chosen action
    pub fn build_continuation_prompt(request: &NarrativeRequest) -> String {
        let mut lines = story_block(request, "Here's a story in progress:");
        if let Some(action) = request.chosen_action() {
            lines.push(format!("The reader has chosen to: \"{}\"", action));
            lines.push(String::new());
        }
        lines.extend(genre_line(request.genre));
        lines.extend(character_lines(request));
        lines.push(
            "Continue the story with a new paragraph (3-5 sentences) based on this choice. Make it engaging and leave room for further choices."
                .to_string(),
        );
        lines.push(PROSE_ONLY.to_string());
        lines.push(
            "Provide only the new paragraph as plain prose with no additional text, headings or explanation."
                .to_string(),
        );
        lines.join("\n")
    }

    /// Build the prompt that wraps the story up
    pub fn build_ending_prompt(request: &NarrativeRequest) -> String {
        let mut lines = story_block(request, "Here's a story that needs an ending:");
        lines.extend(genre_line(request.genre));
        lines.extend(character_lines(request));
        lines.push(
            "Generate a satisfying conclusion (2-4 sentences) that wraps up the story.".to_string(),
        );
        lines.push(PROSE_ONLY.to_string());
        lines.push(
            "Provide only the ending paragraph as plain prose with no additional text or explanation."
                .to_string(),
        );
        lines.join("\n")
    }

    /// Build the prompt summarising the path the reader took
    pub fn build_recap_prompt(
        choices_made: &[String],
        genre: Option<Genre>,
        character_name: Option<&str>,
    ) -> String {
        let mut lines = vec![format!(
            "Write a short recap (2-3 sentences) of the journey through {} in which the reader made these choices, in order:",
            story_noun(genre)
        )];
        lines.push(String::new());
        for choice in choices_made.iter().filter_map(|c| non_blank(Some(c))) {
            lines.push(format!("- {}", choice));
        }
        lines.push(String::new());
        if let Some(name) = clause(character_name) {
            lines.push(format!("Refer to the main character as {}.", name));
        }
        lines.push(
            "Write it in the second person as flowing prose. Do not use a list, and provide only the recap with no additional text."
                .to_string(),
        );
        lines.join("\n")
    }
}

fn story_block(request: &NarrativeRequest, heading: &str) -> Vec<String> {
    let mut lines = vec![heading.to_string(), String::new()];
    if let Some(story) = request.story_so_far() {
        lines.push(story.to_string());
        lines.push(String::new());
    }
    lines
}

fn genre_line(genre: Option<Genre>) -> Option<String> {
    genre.map(|g| format!("The story is in the {} genre.", g.label()))
}

fn character_lines(request: &NarrativeRequest) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(name) = clause(request.character_name()) {
        lines.push(format!("The main character is named {}.", name));
    }
    if let Some(trait_) = clause(request.character_trait()) {
        lines.push(format!("The main character can be described as {}.", trait_));
    }
    lines
}

fn list_format_instruction(count: usize) -> String {
    format!(
        "Format the output as a JSON array of {} strings, with no additional text or explanation.",
        count
    )
}

/// "a fantasy story", "an adventure story", "a story"
fn story_noun(genre: Option<Genre>) -> String {
    match genre {
        Some(g) => {
            let label = g.label();
            let article = if label.starts_with(['a', 'e', 'i', 'o', 'u']) {
                "an"
            } else {
                "a"
            };
            format!("{} {} story", article, label)
        }
        None => "a story".to_string(),
    }
}

/// Drop trailing sentence punctuation so user text can sit inside our own sentence
fn trim_sentence(value: &str) -> &str {
    value.trim().trim_end_matches(['.', '!', '?', ',', ';', ':']).trim_end()
}

/// User text fit to sit inside one of our sentences, or `None` if nothing is left
fn clause(value: Option<&str>) -> Option<&str> {
    non_blank(value).map(trim_sentence).filter(|v| !v.is_empty())
}

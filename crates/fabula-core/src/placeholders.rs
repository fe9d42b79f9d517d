//! Deterministic stand-ins used when the model gives us nothing usable.

use fabula_narrative::Genre;

pub const ENDING: &str = "And thus, the story came to its conclusion.";

const CHOICES: [&str; 3] = [
    "Continue the adventure",
    "Take an unexpected turn",
    "Face a new challenge",
];

const EXTRA_CHOICE: &str = "Explore another path";

/// Starter placeholder for slot `index`
pub fn starter(genre: Option<Genre>, index: usize) -> String {
    let topic = genre.map(|g| g.label()).unwrap_or("story");
    match index % 3 {
        0 => format!("In a world of {}, an unexpected adventure begins...", topic),
        1 => format!("The {} tale unfolds with a surprising twist...", topic),
        _ => format!("A {} story starts with an unusual discovery...", topic),
    }
}

/// Choice placeholder for slot `index`
pub fn choice(index: usize) -> String {
    CHOICES.get(index).copied().unwrap_or(EXTRA_CHOICE).to_string()
}

pub fn continuation(chosen_action: &str) -> String {
    let action = chosen_action
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .trim_end();
    format!("The story continues as you {}...", action)
}

pub fn custom_starter(idea: &str) -> String {
    let idea = idea.trim().trim_end_matches(['.', '!', '?']).trim_end();
    format!("A story begins with {}...", idea)
}

pub fn recap(choice_count: usize) -> String {
    match choice_count {
        0 => String::new(),
        1 => "You made a single choice, and it carried the story all the way to its end."
            .to_string(),
        n => format!(
            "You made {} choices along the way, each one shaping how the story unfolded.",
            n
        ),
    }
}

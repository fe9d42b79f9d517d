use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Story genres offered to readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Fantasy,
    SciFi,
    Mystery,
    Romance,
    Adventure,
    Horror,
    HistoricalFiction,
    Comedy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown genre '{0}'. Choose from: fantasy, sci-fi, mystery, romance, adventure, horror, historical fiction, comedy")]
pub struct UnknownGenre(pub String);

impl Genre {
    pub const ALL: [Genre; 8] = [
        Genre::Fantasy,
        Genre::SciFi,
        Genre::Mystery,
        Genre::Romance,
        Genre::Adventure,
        Genre::Horror,
        Genre::HistoricalFiction,
        Genre::Comedy,
    ];

    /// Wording used inside prompts and placeholder text
    pub fn label(&self) -> &'static str {
        match self {
            Genre::Fantasy => "fantasy",
            Genre::SciFi => "science fiction",
            Genre::Mystery => "mystery",
            Genre::Romance => "romance",
            Genre::Adventure => "adventure",
            Genre::Horror => "horror",
            Genre::HistoricalFiction => "historical fiction",
            Genre::Comedy => "comedy",
        }
    }

    /// Parse an optional client-supplied genre, treating blanks and unknown values as absent
    pub fn parse_lenient(value: Option<&str>) -> Option<Genre> {
        value.and_then(|v| v.parse().ok())
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slug = match self {
            Genre::Fantasy => "fantasy",
            Genre::SciFi => "sci-fi",
            Genre::Mystery => "mystery",
            Genre::Romance => "romance",
            Genre::Adventure => "adventure",
            Genre::Horror => "horror",
            Genre::HistoricalFiction => "historical-fiction",
            Genre::Comedy => "comedy",
        };
        write!(f, "{}", slug)
    }
}

impl std::str::FromStr for Genre {
    type Err = UnknownGenre;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "fantasy" => Ok(Genre::Fantasy),
            "sci-fi" | "scifi" | "science-fiction" => Ok(Genre::SciFi),
            "mystery" => Ok(Genre::Mystery),
            "romance" => Ok(Genre::Romance),
            "adventure" => Ok(Genre::Adventure),
            "horror" => Ok(Genre::Horror),
            "historical-fiction" | "historical" => Ok(Genre::HistoricalFiction),
            "comedy" => Ok(Genre::Comedy),
            _ => Err(UnknownGenre(s.trim().to_string())),
        }
    }
}

/// Parameters for one narrative operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeRequest {
    pub genre: Option<Genre>,
    pub character_name: Option<String>,
    pub character_trait: Option<String>,
    #[serde(default)]
    pub story_so_far: String,
    pub chosen_action: Option<String>,
}

impl NarrativeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = Some(genre);
        self
    }

    pub fn with_character(mut self, name: impl Into<String>, trait_: Option<String>) -> Self {
        self.character_name = Some(name.into());
        self.character_trait = trait_;
        self
    }

    pub fn with_story_so_far(mut self, story: impl Into<String>) -> Self {
        self.story_so_far = story.into();
        self
    }

    pub fn with_chosen_action(mut self, action: impl Into<String>) -> Self {
        self.chosen_action = Some(action.into());
        self
    }

    pub fn character_name(&self) -> Option<&str> {
        non_blank(self.character_name.as_deref())
    }

    pub fn character_trait(&self) -> Option<&str> {
        non_blank(self.character_trait.as_deref())
    }

    pub fn chosen_action(&self) -> Option<&str> {
        non_blank(self.chosen_action.as_deref())
    }

    pub fn story_so_far(&self) -> Option<&str> {
        non_blank(Some(self.story_so_far.as_str()))
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

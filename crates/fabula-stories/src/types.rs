use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoryError {
    #[error("Story has already ended; no further parts can be added")]
    AlreadyEnded,
}

/// A story: ordered narrative parts plus metadata.
///
/// `parts` only grows. The ending is the last append, after which the story
/// is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    parts: Vec<String>,
    ended: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub character_name: Option<String>,
    #[serde(default)]
    pub character_trait: Option<String>,
    #[serde(default)]
    pub choices_made: Vec<String>,
}

impl Story {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            parts: Vec::new(),
            ended: false,
            created_at: Utc::now(),
            genre: None,
            character_name: None,
            character_trait: None,
            choices_made: Vec::new(),
        }
    }

    /// Build a story from parts produced elsewhere (e.g. a client-held session)
    pub fn from_parts(title: impl Into<String>, parts: Vec<String>, ended: bool) -> Self {
        Self {
            parts,
            ended,
            ..Self::new(title)
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append the next narrative part
    pub fn append(&mut self, part: impl Into<String>) -> Result<(), StoryError> {
        if self.ended {
            return Err(StoryError::AlreadyEnded);
        }
        self.parts.push(part.into());
        Ok(())
    }

    /// Append the ending and close the story
    pub fn end(&mut self, ending: impl Into<String>) -> Result<(), StoryError> {
        self.append(ending)?;
        self.ended = true;
        Ok(())
    }

    pub fn record_choice(&mut self, choice: impl Into<String>) {
        self.choices_made.push(choice.into());
    }

    /// All parts joined as paragraphs
    pub fn full_text(&self) -> String {
        self.parts.join("\n\n")
    }

    pub fn summary(&self) -> StorySummary {
        let preview = self
            .parts
            .first()
            .map(|p| {
                if p.chars().count() > 100 {
                    format!("{}...", p.chars().take(100).collect::<String>())
                } else {
                    p.clone()
                }
            })
            .unwrap_or_default();

        StorySummary {
            id: self.id.clone().unwrap_or_default(),
            title: self.title.clone(),
            created_at: self.created_at,
            ended: self.ended,
            parts: self.parts.len(),
            preview,
        }
    }
}

/// Summary for list views and the recency index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub ended: bool,
    pub parts: usize,
    pub preview: String,
}

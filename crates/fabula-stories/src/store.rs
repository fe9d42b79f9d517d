use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Story;

/// Attempts at drawing a fresh id before giving up
const MAX_ID_ATTEMPTS: usize = 5;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Story store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Story {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Story id {0} already belongs to a different story")]
    IdConflict(String),

    #[error("Invalid story id: {0:?}")]
    InvalidId(String),

    #[error("Failed to serialize story: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Could not determine data directory")]
    NoDataDir,
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One JSON file per story under a single directory.
pub struct StoryStore {
    stories_dir: PathBuf,
}

impl StoryStore {
    /// Create a StoryStore using the default data directory.
    pub fn new() -> Result<Self, StoreError> {
        let data_dir = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(Self::with_dir(data_dir.join("fabula").join("stories")))
    }

    /// Create a StoryStore with a custom directory (useful for testing).
    pub fn with_dir(stories_dir: PathBuf) -> Self {
        Self { stories_dir }
    }

    /// Return the stories directory path.
    pub fn stories_dir(&self) -> &PathBuf {
        &self.stories_dir
    }

    /// Create the stories directory if needed.
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.stories_dir).map_err(|e| StoreError::io(&self.stories_dir, e))
    }

    /// Write a story and return its id.
    ///
    /// Stories without an id get a fresh one. A story that already has an id
    /// replaces its own earlier record, but never a different story's.
    pub fn save(&self, story: &Story) -> Result<String, StoreError> {
        self.ensure_dir()?;

        let Some(id) = story.id.as_deref() else {
            return self.save_new(story, generate_id);
        };

        validate_id(id)?;
        if let Some(existing) = self.get(id)? {
            if existing.created_at != story.created_at {
                return Err(StoreError::IdConflict(id.to_string()));
            }
        }

        let tmp = self.write_tmp(story, id)?;
        let path = self.path_for(id);
        if let Err(e) = std::fs::rename(&tmp, &path) {
            discard(&tmp);
            return Err(StoreError::io(&path, e));
        }

        debug!(story_id = %id, parts = story.len(), "Saved story");
        Ok(id.to_string())
    }

    /// Write the record under a temporary name, then hard-link it into place.
    /// The link fails instead of replacing a record that already holds the id,
    /// and readers only ever see a complete file.
    fn save_new(
        &self,
        story: &Story,
        mut next_id: impl FnMut() -> String,
    ) -> Result<String, StoreError> {
        let mut last_path = self.stories_dir.clone();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = next_id();
            let tmp = self.write_tmp(story, &id)?;
            let path = self.path_for(&id);
            let linked = std::fs::hard_link(&tmp, &path);
            discard(&tmp);

            match linked {
                Ok(()) => {
                    debug!(story_id = %id, parts = story.len(), "Saved new story");
                    return Ok(id);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(story_id = %id, "Generated story id already taken, retrying");
                    last_path = path;
                }
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
        Err(StoreError::io(
            &last_path,
            std::io::Error::new(ErrorKind::AlreadyExists, "could not allocate a unique story id"),
        ))
    }

    /// Serialize `story` under `id` into a hidden temp file
    fn write_tmp(&self, story: &Story, id: &str) -> Result<PathBuf, StoreError> {
        let mut record = story.clone();
        record.id = Some(id.to_string());
        let json = serde_json::to_string_pretty(&record)?;

        let tmp = self.stories_dir.join(format!(".{}.json.tmp", id));
        if let Err(e) = std::fs::write(&tmp, json) {
            discard(&tmp);
            return Err(StoreError::io(&tmp, e));
        }
        Ok(tmp)
    }

    /// Get a story by id. `Ok(None)` when no such story exists.
    pub fn get(&self, id: &str) -> Result<Option<Story>, StoreError> {
        validate_id(id)?;
        let path = self.path_for(id);
        match read_story(&path, id) {
            Ok(story) => Ok(Some(story)),
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List every readable story, newest first. Unreadable records are skipped.
    pub fn list(&self) -> Result<Vec<Story>, StoreError> {
        if !self.stories_dir.exists() {
            return Ok(Vec::new());
        }

        let entries =
            std::fs::read_dir(&self.stories_dir).map_err(|e| StoreError::io(&self.stories_dir, e))?;

        let mut stories = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(dir = ?self.stories_dir, error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if id.starts_with('.') {
                continue;
            }

            match read_story(&path, id) {
                Ok(story) => stories.push(story),
                Err(e) => warn!(path = ?path, error = %e, "Skipping unreadable story"),
            }
        }

        // Newest first
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(stories)
    }

    /// Delete a story. Returns `Ok(false)` if there was nothing to delete.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        validate_id(id)?;
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(story_id = %id, "Deleted story");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.stories_dir.join(format!("{}.json", id))
    }
}

/// Time-ordered id with a random suffix, e.g. `20260120_100000_3f9a1c2b`
pub fn generate_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
}

/// Best-effort removal of a temp file
fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = ?path, error = %e, "Failed to remove temp file");
        }
    }
}

fn validate_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

fn read_story(path: &Path, id: &str) -> Result<Story, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let mut story: Story = serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        reason: e.to_string(),
    })?;

    match story.id.as_deref() {
        Some(stored) if stored != id => {
            return Err(StoreError::Corrupt {
                id: id.to_string(),
                reason: format!("record claims id {}", stored),
            });
        }
        Some(_) => {}
        None => story.id = Some(id.to_string()),
    }

    Ok(story)
}

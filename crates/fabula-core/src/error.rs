use thiserror::Error;

use fabula_narrative::UnknownGenre;
use fabula_stories::{StoreError, StoryError};

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    UnknownGenre(#[from] UnknownGenre),

    #[error("No story is in progress; begin one first")]
    NoActiveStory,

    #[error(transparent)]
    Story(#[from] StoryError),

    #[error("The story has reached its limit of {0} parts; end it to finish")]
    LimitReached(usize),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl NarrativeError {
    /// True when the caller sent something unusable, as opposed to a server-side fault
    pub fn is_client_error(&self) -> bool {
        !matches!(self, NarrativeError::Store(_))
    }
}

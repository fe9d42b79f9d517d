//! Narrative operations for fabula.
//!
//! [`Storyteller`] runs each operation end to end: build the prompt, call
//! the model with retry, recover structured output and fill any gaps with
//! deterministic placeholders. [`StorySession`] drives one reader's story
//! from starter to saved ending.

mod error;
mod outcome;
pub mod placeholders;
mod session;
mod storyteller;

#[cfg(test)]
mod test_support;

pub use error::NarrativeError;
pub use outcome::{Generated, Provenance};
pub use session::{
    Advanced, Begun, Finished, SessionLimits, SessionRegistry, SessionSnapshot, StorySession,
    StoryStart,
};
pub use storyteller::{StoryConfig, Storyteller};

//! # fabula-narrative
//!
//! Prompt construction and response normalization for the narrative operations.
//!
//! ## Key Types
//!
//! - [`NarrativeRequest`] - Per-request story parameters
//! - [`Genre`] - Supported story genres
//! - [`NarrativePrompts`] - Prompt templates (starters, choices, continuation, ending, recap)
//!
//! Model replies are turned back into lists with [`normalize_list`] and into
//! display prose with [`normalize_prose`] / [`clean_narrative`].

mod cleanup;
pub mod normalize;
mod prompts;
mod request;

pub use cleanup::clean_narrative;
pub use normalize::{fit_to_count, normalize_list, normalize_list_for, normalize_prose};
pub use prompts::NarrativePrompts;
pub use request::{Genre, NarrativeRequest, UnknownGenre};

//! Story persistence for fabula.
//!
//! Stories live as one pretty-printed JSON file per record under a single
//! directory. [`RecentStories`] is the small in-memory recency index kept
//! per reader session.

pub mod recent;
pub mod store;
pub mod types;

pub use recent::{RecentStories, DEFAULT_RECENT_CAPACITY};
pub use store::{generate_id, StoreError, StoryStore};
pub use types::{Story, StoryError, StorySummary};

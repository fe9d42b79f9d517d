use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use fabula_narrative::{Genre, NarrativeRequest};
use fabula_stories::{RecentStories, Story, StoryError, StoryStore, DEFAULT_RECENT_CAPACITY};

use crate::error::NarrativeError;
use crate::storyteller::Storyteller;

const DEFAULT_TITLE: &str = "Untitled Story";

/// How a reader starts a session story
#[derive(Debug, Clone, Default)]
pub struct StoryStart {
    pub starter: String,
    pub title: Option<String>,
    pub genre: Option<Genre>,
    pub character_name: Option<String>,
    pub character_trait: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Begun {
    pub story: Story,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advanced {
    pub next_part: String,
    /// Empty once the part limit is reached
    pub choices: Vec<String>,
    pub limit_reached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finished {
    pub ending: String,
    pub story_id: String,
    pub recap: String,
}

/// One reader's in-progress story plus their recency index.
///
/// The recency index sits behind its own lock, held only for quick edits, so
/// it can be changed while the session itself is busy generating.
#[derive(Debug)]
pub struct StorySession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    draft: Option<Story>,
    genre: Option<Genre>,
    recent: Arc<Mutex<RecentStories>>,
}

/// Point-in-time view of a session for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub draft: Option<Story>,
    pub recent: RecentStories,
}

impl StorySession {
    pub fn new(id: impl Into<String>, recent_capacity: usize) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            draft: None,
            genre: None,
            recent: Arc::new(Mutex::new(RecentStories::with_capacity(recent_capacity))),
        }
    }

    pub fn draft(&self) -> Option<&Story> {
        self.draft.as_ref()
    }

    pub async fn recent(&self) -> RecentStories {
        self.recent.lock().await.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            draft: self.draft.clone(),
            recent: self.recent().await,
        }
    }

    pub async fn forget_story(&self, story_id: &str) -> bool {
        self.recent.lock().await.remove(story_id)
    }

    /// Start a fresh draft from the chosen starter and offer the first choices
    pub async fn begin(
        &mut self,
        teller: &Storyteller,
        start: StoryStart,
    ) -> Result<Begun, NarrativeError> {
        let starter = start.starter.trim();
        if starter.is_empty() {
            return Err(NarrativeError::MissingField("starter"));
        }

        let title = start
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE);

        let mut story = Story::new(title);
        story.genre = start.genre.map(|g| g.to_string());
        story.character_name = start.character_name;
        story.character_trait = start.character_trait;
        story.append(starter)?;

        self.genre = start.genre;
        let choices = teller
            .choices(&self.request_for(&story), None)
            .await?
            .into_value();

        info!(session_id = %self.id, title = %story.title, "Story begun");
        self.draft = Some(story.clone());
        Ok(Begun { story, choices })
    }

    /// Continue the draft with the reader's chosen action
    pub async fn advance(
        &mut self,
        teller: &Storyteller,
        chosen_action: &str,
    ) -> Result<Advanced, NarrativeError> {
        let max_parts = teller.config().max_story_parts;
        let draft = self.draft.as_ref().ok_or(NarrativeError::NoActiveStory)?;
        if draft.is_ended() {
            return Err(StoryError::AlreadyEnded.into());
        }
        if draft.len() >= max_parts {
            return Err(NarrativeError::LimitReached(max_parts));
        }

        let request = self.request_for(draft).with_chosen_action(chosen_action);
        let next_part = teller.continue_story(&request).await?.into_value();

        let mut story = draft.clone();
        story.append(next_part.clone())?;
        story.record_choice(chosen_action.trim());

        let limit_reached = story.len() >= max_parts;
        let choices = if limit_reached {
            Vec::new()
        } else {
            teller
                .choices(&self.request_for(&story), None)
                .await?
                .into_value()
        };

        debug!(
            session_id = %self.id,
            parts = story.len(),
            limit_reached,
            "Story advanced"
        );
        self.draft = Some(story);
        Ok(Advanced {
            next_part,
            choices,
            limit_reached,
        })
    }

    /// Generate the ending, persist the story and clear the draft
    pub async fn finish(
        &mut self,
        teller: &Storyteller,
        store: &StoryStore,
    ) -> Result<Finished, NarrativeError> {
        let draft = self.draft.as_ref().ok_or(NarrativeError::NoActiveStory)?;
        if draft.is_ended() {
            return Err(StoryError::AlreadyEnded.into());
        }

        let request = self.request_for(draft);
        let ending = teller.ending(&request).await?.into_value();
        let recap = teller
            .recap(&draft.choices_made, self.genre, draft.character_name.as_deref())
            .await
            .into_value();

        let mut story = draft.clone();
        story.end(ending.clone())?;
        let story_id = store.save(&story)?;
        story.id = Some(story_id.clone());

        self.recent.lock().await.push(story.summary());
        self.draft = None;

        info!(session_id = %self.id, story_id = %story_id, parts = story.len(), "Story finished");
        Ok(Finished {
            ending,
            story_id,
            recap,
        })
    }

    fn request_for(&self, story: &Story) -> NarrativeRequest {
        NarrativeRequest {
            genre: self.genre,
            character_name: story.character_name.clone(),
            character_trait: story.character_trait.clone(),
            story_so_far: story.full_text(),
            chosen_action: None,
        }
    }
}

/// Bounds on the number and lifetime of live sessions
#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub recent_capacity: usize,
    /// Oldest-used sessions are dropped past this many
    pub max_sessions: usize,
    /// Sessions unused for this long are dropped
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            recent_capacity: DEFAULT_RECENT_CAPACITY,
            max_sessions: 1000,
            idle_ttl: Duration::from_secs(60 * 60),
        }
    }
}

struct Entry {
    session: Arc<Mutex<StorySession>>,
    recent: Arc<Mutex<RecentStories>>,
    last_used: Instant,
}

/// All live reader sessions, keyed by session id.
///
/// Each session sits behind its own lock so concurrent requests for one
/// reader are serialized while different readers proceed independently.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Entry>>,
    limits: SessionLimits,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(SessionLimits::default())
    }
}

impl SessionRegistry {
    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
        }
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    /// Open a new session and return its id. Idle sessions are dropped first,
    /// then the least recently used ones if the registry is still full.
    pub async fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = StorySession::new(id.clone(), self.limits.recent_capacity);
        let recent = session.recent.clone();

        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let idle = evict_idle(&mut sessions, now, self.limits.idle_ttl);
        let max = self.limits.max_sessions.max(1);
        let mut crowded = 0;
        while sessions.len() >= max {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            crowded += 1;
        }
        if idle + crowded > 0 {
            info!(idle, crowded, live = sessions.len(), "Evicted sessions");
        }

        sessions.insert(
            id.clone(),
            Entry {
                session: Arc::new(Mutex::new(session)),
                recent,
                last_used: now,
            },
        );
        debug!(session_id = %id, "Session created");
        id
    }

    /// Look up a session and mark it as used
    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<StorySession>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(entry.session.clone())
    }

    /// Drop sessions idle for longer than the configured TTL; returns how many
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let removed = evict_idle(&mut sessions, Instant::now(), self.limits.idle_ttl);
        if removed > 0 {
            info!(removed, live = sessions.len(), "Evicted idle sessions");
        }
        removed
    }

    /// Drop a deleted story from every session's recency index.
    /// Never waits on a session that is busy generating.
    pub async fn forget_story(&self, story_id: &str) -> usize {
        let indexes: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.recent.clone())
            .collect();
        let mut removed = 0;
        for recent in indexes {
            if recent.lock().await.remove(story_id) {
                removed += 1;
            }
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn evict_idle(sessions: &mut HashMap<String, Entry>, now: Instant, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| now.duration_since(entry.last_used) < ttl);
    before - sessions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storyteller::StoryConfig;
    use crate::test_support::{storyteller_with, ScriptedModel};
    use tempfile::TempDir;

    fn start(starter: &str) -> StoryStart {
        StoryStart {
            starter: starter.to_string(),
            title: Some("The Vault".to_string()),
            genre: Some(Genre::Mystery),
            character_name: Some("Ada".to_string()),
            character_trait: None,
        }
    }

    #[tokio::test]
    async fn test_full_session_flow_saves_story() {
        let dir = TempDir::new().unwrap();
        let store = StoryStore::with_dir(dir.path().to_path_buf());
        let model = ScriptedModel::sequence(&[
            r#"["Pick the lock", "Call for help", "Wait"]"#,
            "The lock clicked and the vault yawned open.",
            r#"["Step inside", "Close it again", "Look around"]"#,
            "Ada found the ledger and the case was closed.",
            "You picked a lock and solved a case.",
        ]);
        let teller = storyteller_with(model, StoryConfig::default());
        let mut session = StorySession::new("s1", 5);

        let begun = session.begin(&teller, start("A vault stood sealed.")).await.unwrap();
        assert_eq!(begun.choices.len(), 3);
        assert_eq!(begun.story.parts().len(), 1);

        let advanced = session.advance(&teller, "Pick the lock").await.unwrap();
        assert_eq!(advanced.next_part, "The lock clicked and the vault yawned open.");
        assert!(!advanced.limit_reached);
        assert_eq!(advanced.choices[0], "Step inside");

        let finished = session.finish(&teller, &store).await.unwrap();
        assert_eq!(finished.recap, "You picked a lock and solved a case.");
        assert!(session.draft().is_none());
        assert_eq!(session.recent().await.len(), 1);

        let saved = store.get(&finished.story_id).unwrap().unwrap();
        assert!(saved.is_ended());
        assert_eq!(saved.title, "The Vault");
        assert_eq!(saved.genre.as_deref(), Some("mystery"));
        assert_eq!(saved.choices_made, vec!["Pick the lock"]);
        assert_eq!(
            saved.parts().to_vec(),
            vec![
                "A vault stood sealed.".to_string(),
                "The lock clicked and the vault yawned open.".to_string(),
                "Ada found the ledger and the case was closed.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_limit_reached_blocks_further_parts() {
        let teller = storyteller_with(
            ScriptedModel::always("The corridor stretched on."),
            StoryConfig::default().with_max_story_parts(2),
        );
        let mut session = StorySession::new("s1", 5);
        session.begin(&teller, start("It began.")).await.unwrap();

        let advanced = session.advance(&teller, "walk").await.unwrap();
        assert!(advanced.limit_reached);
        assert!(advanced.choices.is_empty());

        let err = session.advance(&teller, "walk more").await.unwrap_err();
        assert!(matches!(err, NarrativeError::LimitReached(2)));
    }

    #[tokio::test]
    async fn test_advance_without_story() {
        let teller = storyteller_with(ScriptedModel::always("x"), StoryConfig::default());
        let mut session = StorySession::new("s1", 5);
        let err = session.advance(&teller, "run").await.unwrap_err();
        assert!(matches!(err, NarrativeError::NoActiveStory));
    }

    #[tokio::test]
    async fn test_begin_requires_starter() {
        let teller = storyteller_with(ScriptedModel::always("x"), StoryConfig::default());
        let mut session = StorySession::new("s1", 5);
        let err = session.begin(&teller, start("  ")).await.unwrap_err();
        assert!(matches!(err, NarrativeError::MissingField("starter")));
        assert!(session.draft().is_none());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_draft() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let store = StoryStore::with_dir(blocker.join("stories"));

        let teller = storyteller_with(ScriptedModel::always("The end came."), StoryConfig::default());
        let mut session = StorySession::new("s1", 5);
        session.begin(&teller, start("It began.")).await.unwrap();

        let err = session.finish(&teller, &store).await.unwrap_err();
        assert!(matches!(err, NarrativeError::Store(_)));
        assert!(!err.is_client_error());
        let draft = session.draft().unwrap();
        assert!(!draft.is_ended());
        assert_eq!(draft.len(), 1);
    }

    #[tokio::test]
    async fn test_registry_forgets_deleted_story_everywhere() {
        let registry = SessionRegistry::default();
        let a = registry.create().await;
        let b = registry.create().await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);

        for id in [&a, &b] {
            let session = registry.get(id).await.unwrap();
            let mut story = Story::new("Shared");
            story.id = Some("20260101_000000_shared".to_string());
            session.lock().await.recent.lock().await.push(story.summary());
        }

        assert_eq!(registry.forget_story("20260101_000000_shared").await, 2);
        assert_eq!(registry.forget_story("20260101_000000_shared").await, 0);
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_forget_story_does_not_wait_on_generation() {
        let registry = Arc::new(SessionRegistry::default());
        let id = registry.create().await;
        let session = registry.get(&id).await.unwrap();
        let mut story = Story::new("Old");
        story.id = Some("20260101_000000_old".to_string());
        session.lock().await.recent.lock().await.push(story.summary());

        let teller = storyteller_with(
            ScriptedModel::slow(r#"["Wait"]"#, Duration::from_secs(5)),
            StoryConfig::default(),
        );
        let busy = session.clone();
        let generating = tokio::spawn(async move {
            busy.lock().await.begin(&teller, start("It began.")).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.try_lock().is_err());

        let removed = tokio::time::timeout(
            Duration::from_secs(1),
            registry.forget_story("20260101_000000_old"),
        )
        .await
        .expect("forget_story blocked on a generating session");
        assert_eq!(removed, 1);
        generating.abort();
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let registry = SessionRegistry::with_limits(SessionLimits {
            idle_ttl: Duration::from_millis(40),
            ..SessionLimits::default()
        });
        let stale = registry.create().await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let fresh = registry.create().await;
        assert!(registry.get(&stale).await.is_none());
        assert!(registry.get(&fresh).await.is_some());
        assert_eq!(registry.len().await, 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_registry_drops_least_recently_used() {
        let registry = SessionRegistry::with_limits(SessionLimits {
            max_sessions: 2,
            ..SessionLimits::default()
        });
        let first = registry.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = registry.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Touching the first makes the second the oldest
        assert!(registry.get(&first).await.is_some());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let third = registry.create().await;
        assert_eq!(registry.len().await, 2);
        assert!(registry.get(&second).await.is_none());
        assert!(registry.get(&first).await.is_some());
        assert!(registry.get(&third).await.is_some());

        for _ in 0..10 {
            registry.create().await;
        }
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_snapshot_shows_draft_and_recent() {
        let teller = storyteller_with(ScriptedModel::always(r#"["Go"]"#), StoryConfig::default());
        let mut session = StorySession::new("s1", 5);
        session.begin(&teller, start("It began.")).await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.id, "s1");
        assert_eq!(snapshot.draft.unwrap().len(), 1);
        assert!(snapshot.recent.is_empty());
    }
}

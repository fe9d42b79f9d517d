use std::fs;

use chrono::{Duration, TimeZone, Utc};
use fabula_stories::{StoreError, Story, StoryStore};
use tempfile::TempDir;

fn sample_story(title: &str) -> Story {
    let mut story = Story::new(title);
    story.genre = Some("fantasy".to_string());
    story.character_name = Some("Mira".to_string());
    story.append("The gate creaked open.").unwrap();
    story.record_choice("step through the gate");
    story.append("Beyond lay a garden of glass.").unwrap();
    story.end("Mira walked home at dawn.").unwrap();
    story
}

fn store_in(dir: &TempDir) -> StoryStore {
    StoryStore::with_dir(dir.path().join("stories"))
}

// ============================================================
// save / get
// ============================================================

#[test]
fn test_save_then_get_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let story = sample_story("Glass Garden");

    let id = store.save(&story).unwrap();
    let loaded = store.get(&id).unwrap().expect("story should exist");

    assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
    let mut expected = story.clone();
    expected.id = Some(id);
    assert_eq!(loaded, expected);
}

#[test]
fn test_save_leaves_only_the_record_behind() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let id = store.save(&sample_story("Tidy")).unwrap();

    let names: Vec<String> = fs::read_dir(store.stories_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![format!("{}.json", id)]);
}

#[test]
fn test_save_assigns_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let a = store.save(&sample_story("A")).unwrap();
    let b = store.save(&sample_story("B")).unwrap();

    assert_ne!(a, b);
    assert_eq!(store.list().unwrap().len(), 2);
}

#[test]
fn test_resave_same_story_overwrites_its_record() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let mut story = Story::new("Draft");
    story.append("It began.").unwrap();
    let id = store.save(&story).unwrap();

    story.id = Some(id.clone());
    story.end("It ended.").unwrap();
    assert_eq!(store.save(&story).unwrap(), id);

    let loaded = store.get(&id).unwrap().unwrap();
    assert!(loaded.is_ended());
    assert_eq!(loaded.len(), 2);
}

#[test]
fn test_save_refuses_to_overwrite_a_different_story() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let id = store.save(&sample_story("Original")).unwrap();

    let mut imposter = sample_story("Imposter");
    imposter.created_at = Utc::now() - Duration::days(1);
    imposter.id = Some(id.clone());

    let err = store.save(&imposter).unwrap_err();
    assert!(matches!(err, StoreError::IdConflict(ref conflicting) if conflicting == &id));
    assert_eq!(store.get(&id).unwrap().unwrap().title, "Original");
}

#[test]
fn test_get_missing_is_none() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(store.get("20260101_000000_missing").unwrap().is_none());
}

#[test]
fn test_get_corrupt_record_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.ensure_dir().unwrap();
    fs::write(store.stories_dir().join("broken.json"), "{\"title\": \"half").unwrap();

    let err = store.get("broken").unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { ref id, .. } if id == "broken"));
}

#[test]
fn test_get_rejects_path_traversal() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(matches!(
        store.get("../secrets").unwrap_err(),
        StoreError::InvalidId(_)
    ));
}

// ============================================================
// list
// ============================================================

#[test]
fn test_list_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    for (title, day) in [("Middle", 15), ("Oldest", 1), ("Newest", 28)] {
        let mut story = sample_story(title);
        story.created_at = Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap();
        store.save(&story).unwrap();
    }

    let stories = store.list().unwrap();
    let titles: Vec<&str> = stories.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Newest", "Middle", "Oldest"]);
    assert!(stories
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
}

#[test]
fn test_list_skips_unreadable_entries() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.save(&sample_story("Good")).unwrap();

    fs::write(store.stories_dir().join("garbage.json"), "not json").unwrap();
    fs::write(store.stories_dir().join("notes.txt"), "ignored").unwrap();
    fs::create_dir(store.stories_dir().join("folder.json")).unwrap();

    let stories = store.list().unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].title, "Good");
}

#[test]
fn test_list_missing_dir_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = StoryStore::with_dir(dir.path().join("never-created"));
    assert!(store.list().unwrap().is_empty());
}

// ============================================================
// delete
// ============================================================

#[test]
fn test_delete_existing_then_missing() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let id = store.save(&sample_story("Doomed")).unwrap();

    assert!(store.delete(&id).unwrap());
    assert!(store.get(&id).unwrap().is_none());
    assert!(!store.delete(&id).unwrap());
}

#[test]
fn test_delete_nonexistent_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(!store.delete("20260101_000000_nothing").unwrap());
}

#[test]
fn test_record_without_id_field_takes_file_stem() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.ensure_dir().unwrap();

    let legacy = r#"{"title":"Legacy","parts":["Once."],"ended":false,"createdAt":"2026-01-20T10:00:00Z"}"#;
    fs::write(store.stories_dir().join("20260120_100000_abc123.json"), legacy).unwrap();

    let story = store.get("20260120_100000_abc123").unwrap().unwrap();
    assert_eq!(story.id.as_deref(), Some("20260120_100000_abc123"));
    assert_eq!(story.parts().to_vec(), vec!["Once.".to_string()]);
    assert!(story.choices_made.is_empty());
}

//! Durable list of voice-note metadata.
//!
//! The whole collection lives under one key and every mutation rewrites it.
//! There is a single writer (the foreground controller), so no locking or
//! versioning is done here.

use std::{
    cmp::Ordering,
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::{
    db::{KeyValueStore, VOICE_NOTES_KEY},
    error::{Result, VoiceNoteError},
    models::{NewVoiceNote, VoiceNote},
};

pub struct NoteCatalog {
    store: Arc<dyn KeyValueStore>,
    sort_newest_first: bool,
}

impl NoteCatalog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            sort_newest_first: true,
        }
    }

    /// Keep notes in insertion order instead of newest first.
    pub fn without_sorting(mut self) -> Self {
        self.sort_newest_first = false;
        self
    }

    /// Assigns an id, appends the note and writes the collection back.
    pub async fn create(&self, note: NewVoiceNote) -> Result<VoiceNote> {
        let mut notes = self.load().await?;
        let id = next_id(&notes, Utc::now().timestamp_millis());
        let created = note.with_id(id);

        notes.push(created.clone());
        self.sort(&mut notes);
        self.persist(&notes).await?;

        info!("Created voice note {} ({})", created.id, created.title);
        Ok(created)
    }

    /// Never fails: a missing, unreadable or malformed collection reads as empty.
    pub async fn list(&self) -> Vec<VoiceNote> {
        match self.load().await {
            Ok(notes) => notes,
            Err(err) => {
                error!("Treating voice note catalog as empty: {err}");
                Vec::new()
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<VoiceNote> {
        self.list().await.into_iter().find(|note| note.id == id)
    }

    pub async fn search(&self, query: &str) -> Vec<VoiceNote> {
        self.list()
            .await
            .into_iter()
            .filter(|note| matches_query(note, query))
            .collect()
    }

    /// Merges `note` onto the stored record with the same id.
    pub async fn update(&self, note: VoiceNote) -> Result<VoiceNote> {
        let mut notes = self.load().await?;
        let index = notes
            .iter()
            .position(|existing| existing.id == note.id)
            .ok_or_else(|| VoiceNoteError::NotFound(note.id.clone()))?;

        let updated = notes[index].merged_with(note);
        notes[index] = updated.clone();
        self.sort(&mut notes);
        self.persist(&notes).await?;

        debug!("Updated voice note {}", updated.id);
        Ok(updated)
    }

    pub async fn rename(&self, id: &str, title: &str) -> Result<VoiceNote> {
        let current = self
            .load()
            .await?
            .into_iter()
            .find(|note| note.id == id)
            .ok_or_else(|| VoiceNoteError::NotFound(id.to_string()))?;

        self.update(VoiceNote {
            title: title.to_string(),
            date: String::new(),
            ..current
        })
        .await
    }

    /// Removes the note and, best effort, its audio file. Returns `false`
    /// when no note has this id.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut notes = self.load().await?;
        let Some(index) = notes.iter().position(|note| note.id == id) else {
            return Ok(false);
        };

        let removed = notes.remove(index);
        let path = audio_path(&removed.uri);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            warn!(
                "Could not delete audio file {} for note {}: {err}",
                path.display(),
                removed.id
            );
        }

        self.persist(&notes).await?;
        info!("Deleted voice note {}", removed.id);
        Ok(true)
    }

    async fn load(&self) -> Result<Vec<VoiceNote>> {
        let raw = self
            .store
            .get_item(VOICE_NOTES_KEY)
            .await
            .context("failed to read voice notes")
            .map_err(VoiceNoteError::Persistence)?;

        match raw {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .context("stored voice notes are malformed")
                .map_err(VoiceNoteError::Persistence),
        }
    }

    async fn persist(&self, notes: &[VoiceNote]) -> Result<()> {
        let serialized = serde_json::to_string(notes)
            .context("failed to serialize voice notes")
            .map_err(VoiceNoteError::Persistence)?;

        self.store
            .set_item(VOICE_NOTES_KEY, serialized)
            .await
            .context("failed to write voice notes")
            .map_err(VoiceNoteError::Persistence)
    }

    fn sort(&self, notes: &mut [VoiceNote]) {
        if self.sort_newest_first {
            notes.sort_by(newest_first);
        }
    }
}

/// Case-insensitive title match; an empty query matches everything.
pub fn matches_query(note: &VoiceNote, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || note.title.to_lowercase().contains(&query.to_lowercase())
}

/// Accepts plain paths as well as `file://` URIs.
pub fn audio_path(uri: &str) -> PathBuf {
    Path::new(uri.strip_prefix("file://").unwrap_or(uri)).to_path_buf()
}

fn next_id(existing: &[VoiceNote], now_ms: i64) -> String {
    let taken: HashSet<&str> = existing.iter().map(|note| note.id.as_str()).collect();
    let mut candidate = now_ms;
    while taken.contains(candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}

fn date_key(note: &VoiceNote) -> (Option<DateTime<Utc>>, &str) {
    (note.date_time(), note.date.as_str())
}

fn newest_first(a: &VoiceNote, b: &VoiceNote) -> Ordering {
    date_key(b).cmp(&date_key(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

    /// Memory store whose reads or writes can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
            if self.fail_reads.load(AtomicOrdering::SeqCst) {
                anyhow::bail!("disk I/O error");
            }
            self.inner.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: String) -> anyhow::Result<()> {
            if self.fail_writes.load(AtomicOrdering::SeqCst) {
                anyhow::bail!("database is locked");
            }
            self.inner.set_item(key, value).await
        }

        async fn remove_item(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove_item(key).await
        }
    }

    fn flaky_catalog() -> (Arc<FlakyStore>, NoteCatalog) {
        let store = Arc::new(FlakyStore::default());
        let catalog = NoteCatalog::new(store.clone());
        (store, catalog)
    }

    fn new_note(title: &str, date: &str) -> NewVoiceNote {
        NewVoiceNote {
            uri: format!("/nonexistent/{title}.wav"),
            title: title.to_string(),
            duration: 3,
            date: date.to_string(),
            size: 1024,
        }
    }

    fn catalog() -> (Arc<MemoryStore>, NoteCatalog) {
        let store = Arc::new(MemoryStore::new());
        let catalog = NoteCatalog::new(store.clone());
        (store, catalog)
    }

    #[test]
    fn next_id_skips_taken_ids() {
        let taken = vec![
            new_note("a", "").with_id("1000".into()),
            new_note("b", "").with_id("1001".into()),
        ];
        assert_eq!(next_id(&taken, 1000), "1002");
        assert_eq!(next_id(&taken, 999), "999");
    }

    #[tokio::test]
    async fn list_on_fresh_store_is_empty() {
        let (_, catalog) = catalog();
        assert!(catalog.list().await.is_empty());
    }

    #[tokio::test]
    async fn create_assigns_unique_ids_and_sorts_newest_first() {
        let (_, catalog) = catalog();
        let dates = [
            "2024-01-02T10:00:00.000Z",
            "2024-01-03T10:00:00.000Z",
            "2024-01-01T10:00:00.000Z",
        ];
        for (i, date) in dates.iter().enumerate() {
            catalog.create(new_note(&format!("n{i}"), date)).await.unwrap();
        }

        let notes = catalog.list().await;
        let ids: HashSet<_> = notes.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        let ordered: Vec<_> = notes.iter().map(|n| n.date.as_str()).collect();
        assert_eq!(
            ordered,
            vec![
                "2024-01-03T10:00:00.000Z",
                "2024-01-02T10:00:00.000Z",
                "2024-01-01T10:00:00.000Z"
            ]
        );
    }

    #[tokio::test]
    async fn unsorted_catalog_keeps_insertion_order() {
        let catalog = NoteCatalog::new(Arc::new(MemoryStore::new())).without_sorting();
        catalog
            .create(new_note("old", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();
        catalog
            .create(new_note("new", "2024-06-01T10:00:00.000Z"))
            .await
            .unwrap();

        let titles: Vec<_> = catalog.list().await.into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn create_then_list_returns_created_record() {
        let (_, catalog) = catalog();
        let created = catalog
            .create(new_note("Recording 1", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();

        let notes = catalog.list().await;
        assert_eq!(notes, vec![created]);
    }

    #[tokio::test]
    async fn malformed_data_lists_empty_but_blocks_writes() {
        let (store, catalog) = catalog();
        store
            .set_item(VOICE_NOTES_KEY, "{not json".into())
            .await
            .unwrap();

        assert!(catalog.list().await.is_empty());
        let err = catalog
            .create(new_note("x", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceNoteError::Persistence(_)));
        assert_eq!(
            store.get_item(VOICE_NOTES_KEY).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn update_preserves_date_unless_given() {
        let (_, catalog) = catalog();
        let created = catalog
            .create(new_note("a", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();

        let renamed = catalog
            .update(VoiceNote {
                title: "b".into(),
                date: String::new(),
                ..created.clone()
            })
            .await
            .unwrap();
        assert_eq!(renamed.date, created.date);
        assert_eq!(renamed.title, "b");

        let redated = catalog
            .update(VoiceNote {
                date: "2025-05-05T05:05:05.000Z".into(),
                ..renamed
            })
            .await
            .unwrap();
        assert_eq!(redated.date, "2025-05-05T05:05:05.000Z");
        assert_eq!(catalog.get(&created.id).await, Some(redated));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let (_, catalog) = catalog();
        let ghost = new_note("ghost", "2024-01-01T10:00:00.000Z").with_id("nope".into());
        let err = catalog.update(ghost).await.unwrap_err();
        assert!(matches!(err, VoiceNoteError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn delete_unknown_id_returns_false_and_leaves_catalog() {
        let (_, catalog) = catalog();
        catalog
            .create(new_note("keep", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();
        let before = catalog.list().await;

        assert!(!catalog.delete("missing").await.unwrap());
        assert_eq!(catalog.list().await, before);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() {
        let (_, catalog) = catalog();
        let created = catalog
            .create(new_note("gone", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();

        assert!(catalog.delete(&created.id).await.unwrap());
        assert!(catalog.get(&created.id).await.is_none());
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let (_, catalog) = catalog();
        catalog
            .create(new_note("Meeting notes", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();
        catalog
            .create(new_note("Groceries", "2024-01-02T10:00:00.000Z"))
            .await
            .unwrap();

        let hits = catalog.search("meet").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Meeting notes");
        assert_eq!(catalog.search("  ").await.len(), 2);
    }

    #[tokio::test]
    async fn read_failure_lists_empty_but_fails_mutations() {
        let (store, catalog) = flaky_catalog();
        let created = catalog
            .create(new_note("a", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();
        store.fail_reads.store(true, AtomicOrdering::SeqCst);

        assert!(catalog.list().await.is_empty());
        assert!(catalog.get(&created.id).await.is_none());

        let err = catalog
            .create(new_note("b", "2024-01-02T10:00:00.000Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceNoteError::Persistence(_)));

        let err = catalog.update(created.clone()).await.unwrap_err();
        assert!(matches!(err, VoiceNoteError::Persistence(_)));

        let err = catalog.delete(&created.id).await.unwrap_err();
        assert!(matches!(err, VoiceNoteError::Persistence(_)));

        store.fail_reads.store(false, AtomicOrdering::SeqCst);
        assert_eq!(catalog.list().await, vec![created]);
    }

    #[tokio::test]
    async fn write_failure_is_reported_and_leaves_catalog() {
        let (store, catalog) = flaky_catalog();
        let created = catalog
            .create(new_note("a", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();
        store.fail_writes.store(true, AtomicOrdering::SeqCst);

        let err = catalog
            .create(new_note("b", "2024-01-02T10:00:00.000Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceNoteError::Persistence(_)));
        assert!(err.to_string().contains("database is locked"), "{err}");

        let err = catalog.rename(&created.id, "renamed").await.unwrap_err();
        assert!(matches!(err, VoiceNoteError::Persistence(_)));

        let err = catalog.delete(&created.id).await.unwrap_err();
        assert!(matches!(err, VoiceNoteError::Persistence(_)));

        assert_eq!(catalog.list().await, vec![created]);
    }

    #[test]
    fn audio_path_strips_file_scheme() {
        assert_eq!(
            audio_path("file:///data/recordings/recording-1.m4a"),
            PathBuf::from("/data/recordings/recording-1.m4a")
        );
        assert_eq!(audio_path("/tmp/a.wav"), PathBuf::from("/tmp/a.wav"));
    }
}

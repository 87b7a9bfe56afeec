//! Note CRUD orchestration.
//!
//! One KV entry per note name, plus an index update for every mutation.
//! The write state machine follows the service contract: an empty-content
//! write to an absent name bootstraps an empty note, an empty-title and
//! empty-content write to an existing note deletes it, and everything else
//! upserts while preserving `created_at`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::Result;
use crate::index::NotesIndex;
use crate::kv::KvStore;
use crate::note::{IndexEntry, Note};

/// Name, title, and content of the note seeded into an empty store.
pub const EXAMPLE_NOTE_NAME: &str = "1";
pub const EXAMPLE_NOTE_TITLE: &str = "Notes support Markdown";
pub const EXAMPLE_NOTE_CONTENT: &str = r"# Welcome

## Features

- **Live preview**: the editor renders Markdown as you type
- **Auto-numbered notes**: new notes pick the next free numeric name
- **Plain-text access**: append `?raw=1` to any note URL
- **Works everywhere**: phone-friendly layout

## Quick start

Start writing your own notes!

```text
Everything in this note is plain Markdown.
```

> Blockquotes work too.

### Lists

1. First ordered item
2. Second ordered item

- An unordered item
- Another unordered item

### Tables

| Feature | Status |
|---------|--------|
| Preview | done   |
| Export  | done   |

**Enjoy!**";

/// Result of a write request to a note name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The note was created or updated.
    Saved {
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    },
    /// The note was removed (empty title and empty content).
    Deleted,
}

/// CRUD over individual note records.
#[derive(Clone)]
pub struct NoteStore {
    store: Arc<dyn KvStore>,
    index: NotesIndex,
}

impl NoteStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        let index = NotesIndex::new(store.clone());
        Self { store, index }
    }

    /// The index kept in sync with this store.
    pub fn index(&self) -> &NotesIndex {
        &self.index
    }

    /// Load a note record.
    ///
    /// A stored value that does not parse as a record is surfaced as a
    /// title-less note whose content is the raw value, so hand-written
    /// entries still read back.
    pub async fn get(&self, name: &str) -> Result<Option<Note>> {
        let Some(raw) = self.store.get(name).await? else {
            return Ok(None);
        };
        let note = serde_json::from_str(&raw).unwrap_or_else(|_| Note::from_raw_content(raw));
        Ok(Some(note))
    }

    /// Apply a write request to `name`.
    ///
    /// - absent record, empty content: bootstrap an empty note (the title
    ///   may still be set)
    /// - existing record, empty content and empty title: delete
    /// - otherwise: upsert, preserving `created_at` when the existing
    ///   record has one
    pub async fn save(&self, name: &str, title: &str, content: &str) -> Result<SaveOutcome> {
        let existing = self.store.get(name).await?;

        if content.trim().is_empty() && existing.is_none() {
            let now = Utc::now();
            self.write_note(name, title, "", now, now).await?;
            return Ok(SaveOutcome::Saved {
                created_at: now,
                updated_at: now,
            });
        }

        if content.trim().is_empty() && title.trim().is_empty() {
            // The record is gone either way; a failed KV delete still gets
            // its index entry dropped, matching the original behavior.
            if let Err(error) = self.store.delete(name).await {
                warn!(%error, %name, "note delete failed");
            }
            self.index.update(name, None).await?;
            return Ok(SaveOutcome::Deleted);
        }

        let existing_note = existing.and_then(|raw| serde_json::from_str::<Note>(&raw).ok());
        let now = Utc::now();
        let created_at = existing_note.and_then(|note| note.created_at).unwrap_or(now);

        self.write_note(name, title, content, created_at, now).await?;
        Ok(SaveOutcome::Saved {
            created_at,
            updated_at: now,
        })
    }

    /// Remove a note and its index entry. Deleting an absent note is fine.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.store.delete(name).await?;
        self.index.update(name, None).await?;
        Ok(())
    }

    /// Sorted directory listing, optionally enriched with note contents.
    ///
    /// Enrichment reads every listed note; an unreadable or unparseable
    /// record contributes an empty string rather than failing the listing.
    pub async fn list(&self, include_content: bool) -> Result<Vec<IndexEntry>> {
        let mut entries = self.index.list().await?;
        if include_content {
            for entry in &mut entries {
                let content = match self.store.get(&entry.name).await {
                    Ok(Some(raw)) => serde_json::from_str::<Note>(&raw)
                        .map(|note| note.content)
                        .unwrap_or_default(),
                    Ok(None) => String::new(),
                    Err(error) => {
                        warn!(%error, name = %entry.name, "listing content read failed");
                        String::new()
                    }
                };
                entry.content = Some(content);
            }
        }
        Ok(entries)
    }

    /// Seed the example note when the index is empty.
    ///
    /// Returns whether a note was created.
    pub async fn seed_example_note(&self) -> Result<bool> {
        if !self.index.list().await?.is_empty() {
            return Ok(false);
        }
        self.save(EXAMPLE_NOTE_NAME, EXAMPLE_NOTE_TITLE, EXAMPLE_NOTE_CONTENT)
            .await?;
        Ok(true)
    }

    async fn write_note(
        &self,
        name: &str,
        title: &str,
        content: &str,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let note = Note {
            title: title.to_string(),
            content: content.to_string(),
            created_at: Some(created_at),
            updated_at: Some(updated_at),
        };
        self.store.put(name, &serde_json::to_string(&note)?).await?;
        self.index
            .update(
                name,
                Some(IndexEntry {
                    name: name.to_string(),
                    title: title.to_string(),
                    created_at,
                    updated_at,
                    content: None,
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    fn store() -> (Arc<MemoryKv>, NoteStore) {
        let kv = Arc::new(MemoryKv::new());
        let notes = NoteStore::new(kv.clone());
        (kv, notes)
    }

    #[tokio::test]
    async fn save_creates_then_reads_back() {
        let (_, notes) = store();
        let outcome = notes.save("foo", "T", "C").await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved { .. }));

        let note = notes.get("foo").await.unwrap().unwrap();
        assert_eq!(note.title, "T");
        assert_eq!(note.content, "C");
        assert!(note.created_at.is_some());
    }

    #[tokio::test]
    async fn update_preserves_created_at() {
        let (_, notes) = store();
        let SaveOutcome::Saved { created_at, .. } = notes.save("foo", "T", "v1").await.unwrap()
        else {
            panic!("expected save");
        };

        let SaveOutcome::Saved {
            created_at: after,
            updated_at,
        } = notes.save("foo", "T", "v2").await.unwrap()
        else {
            panic!("expected save");
        };
        assert_eq!(created_at, after);
        assert!(updated_at >= created_at);
    }

    #[tokio::test]
    async fn empty_write_to_absent_name_bootstraps() {
        let (_, notes) = store();
        let outcome = notes.save("draft", "Title only", "").await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved { .. }));

        let note = notes.get("draft").await.unwrap().unwrap();
        assert_eq!(note.title, "Title only");
        assert_eq!(note.content, "");
        assert_eq!(notes.list(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_write_to_existing_note_deletes() {
        let (_, notes) = store();
        notes.save("foo", "T", "C").await.unwrap();

        let outcome = notes.save("foo", "", "").await.unwrap();
        assert_eq!(outcome, SaveOutcome::Deleted);
        assert!(notes.get("foo").await.unwrap().is_none());
        assert!(notes.list(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitespace_counts_as_empty() {
        let (_, notes) = store();
        notes.save("foo", "T", "C").await.unwrap();
        let outcome = notes.save("foo", "  ", " \n ").await.unwrap();
        assert_eq!(outcome, SaveOutcome::Deleted);
    }

    #[tokio::test]
    async fn explicit_delete_is_idempotent() {
        let (_, notes) = store();
        notes.save("foo", "T", "C").await.unwrap();
        notes.delete("foo").await.unwrap();
        notes.delete("foo").await.unwrap();
        assert!(notes.get("foo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_raw_content() {
        let (kv, notes) = store();
        kv.put("legacy", "plain text, not json").await.unwrap();

        let note = notes.get("legacy").await.unwrap().unwrap();
        assert_eq!(note.content, "plain text, not json");
        assert!(note.created_at.is_none());
    }

    #[tokio::test]
    async fn corrupt_record_update_resets_created_at() {
        let (kv, notes) = store();
        kv.put("legacy", "not json").await.unwrap();

        let SaveOutcome::Saved {
            created_at,
            updated_at,
        } = notes.save("legacy", "T", "fixed").await.unwrap()
        else {
            panic!("expected save");
        };
        assert_eq!(created_at, updated_at);
    }

    #[tokio::test]
    async fn list_with_content_enriches_entries() {
        let (kv, notes) = store();
        notes.save("a", "", "alpha").await.unwrap();
        notes.save("b", "", "beta").await.unwrap();
        // corrupt record contributes empty content, not an error
        kv.put("a", "broken{").await.unwrap();

        let entries = notes.list(true).await.unwrap();
        let by_name = |name: &str| {
            entries
                .iter()
                .find(|e| e.name == name)
                .and_then(|e| e.content.clone())
        };
        assert_eq!(by_name("a"), Some(String::new()));
        assert_eq!(by_name("b"), Some("beta".to_string()));
    }

    #[tokio::test]
    async fn plain_listing_has_no_content() {
        let (_, notes) = store();
        notes.save("a", "", "alpha").await.unwrap();
        assert_eq!(notes.list(false).await.unwrap()[0].content, None);
    }

    #[tokio::test]
    async fn seeds_example_note_once() {
        let (_, notes) = store();
        assert!(notes.seed_example_note().await.unwrap());
        assert!(!notes.seed_example_note().await.unwrap());

        let entries = notes.list(false).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, EXAMPLE_NOTE_NAME);
        assert_eq!(entries[0].title, EXAMPLE_NOTE_TITLE);
    }
}

//! Notes index maintenance.
//!
//! The index is a denormalized JSON array of [`IndexEntry`] under
//! [`keys::INDEX_KEY`], the authoritative list of which notes exist. It is
//! kept in sync with the per-note records through [`NotesIndex::update`],
//! the single synchronization point for every note create, update, and
//! delete. The store gives no multi-key transaction, so a crash between a
//! note write and its index write leaves the two drifted; no reconciliation
//! sweep runs.

use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::keys;
use crate::kv::KvStore;
use crate::note::{IndexEntry, numeric_name};

/// Maintains the denormalized list of all notes.
#[derive(Clone)]
pub struct NotesIndex {
    store: Arc<dyn KvStore>,
    // Serializes the read-modify-write cycle on the index blob within this
    // process. The store itself offers no compare-and-swap.
    write_lock: Arc<Mutex<()>>,
}

impl NotesIndex {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Replace (or remove) the index entry for `name` and persist the array.
    ///
    /// Any existing entry with the same name is dropped first; `entry`
    /// (when given) is appended. The array is written back unconditionally,
    /// even when nothing changed.
    pub async fn update(&self, name: &str, entry: Option<IndexEntry>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await?;
        entries.retain(|item| item.name != name);
        if let Some(mut entry) = entry {
            entry.content = None;
            entries.push(entry);
        }

        let serialized = serde_json::to_string(&entries)?;
        self.store.put(keys::INDEX_KEY, &serialized).await?;
        Ok(())
    }

    /// List all entries, sorted for the directory view.
    ///
    /// Numeric names sort first, descending by value, so the newest
    /// auto-numbered note leads; everything else follows in ascending
    /// lexicographic order.
    pub async fn list(&self) -> Result<Vec<IndexEntry>> {
        let mut entries = self.load().await?;
        entries.sort_by(|a, b| match (numeric_name(&a.name), numeric_name(&b.name)) {
            (Some(a_id), Some(b_id)) => b_id.cmp(&a_id),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        Ok(entries)
    }

    /// Next free numeric id: one past the largest numeric name, or 1.
    pub async fn next_id(&self) -> Result<i64> {
        let entries = self.load().await?;
        let max_id = entries
            .iter()
            .filter_map(|entry| numeric_name(&entry.name))
            .max()
            .unwrap_or(0)
            .max(0);
        Ok(max_id + 1)
    }

    async fn load(&self) -> Result<Vec<IndexEntry>> {
        match self.store.get(keys::INDEX_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::kv::MemoryKv;

    fn index() -> NotesIndex {
        NotesIndex::new(Arc::new(MemoryKv::new()))
    }

    fn entry(name: &str, title: &str) -> IndexEntry {
        let now = Utc::now();
        IndexEntry {
            name: name.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            content: None,
        }
    }

    #[tokio::test]
    async fn update_inserts_exactly_one_entry() {
        let index = index();
        index.update("a", Some(entry("a", "first"))).await.unwrap();
        index.update("a", Some(entry("a", "second"))).await.unwrap();

        let entries = index.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[0].title, "second");
    }

    #[tokio::test]
    async fn update_with_none_removes_entry() {
        let index = index();
        index.update("a", Some(entry("a", ""))).await.unwrap();
        index.update("b", Some(entry("b", ""))).await.unwrap();
        index.update("a", None).await.unwrap();

        let entries = index.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "b");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let index = index();
        index.update("ghost", None).await.unwrap();
        index.update("ghost", None).await.unwrap();
        assert!(index.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_sorts_numeric_desc_then_lexicographic() {
        let index = index();
        for name in ["10", "2", "abc", "1"] {
            index.update(name, Some(entry(name, ""))).await.unwrap();
        }

        let names: Vec<String> = index
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["10", "2", "1", "abc"]);
    }

    #[tokio::test]
    async fn listing_strips_content() {
        let index = index();
        let mut with_content = entry("a", "t");
        with_content.content = Some("secret".to_string());
        index.update("a", Some(with_content)).await.unwrap();

        let entries = index.list().await.unwrap();
        assert_eq!(entries[0].content, None);
    }

    #[tokio::test]
    async fn next_id_over_mixed_names() {
        let index = index();
        for name in ["3", "7", "x"] {
            index.update(name, Some(entry(name, ""))).await.unwrap();
        }
        assert_eq!(index.next_id().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn next_id_defaults_to_one() {
        let index = index();
        assert_eq!(index.next_id().await.unwrap(), 1);
        index.update("abc", Some(entry("abc", ""))).await.unwrap();
        assert_eq!(index.next_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_updates_all_land() {
        let index = index();
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..20 {
            let index = index.clone();
            tasks.spawn(async move {
                let name = format!("note-{i}");
                index.update(&name, Some(entry(&name, ""))).await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        assert_eq!(index.list().await.unwrap().len(), 20);
    }
}

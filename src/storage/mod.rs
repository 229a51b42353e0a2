//! History of announced identities, per source.
//!
//! The store is loaded once per run, mutated in memory by the pipeline and
//! written back as a whole only when something changed.
//!
//! ## File Format
//!
//! ```text
//! {
//!   "Rust Blog": ["https://blog.rust-lang.org/2025/01/09/...", "..."],
//!   "ripgrep": "14.1.1"        <- legacy single-tag form, read as a one-item list
//! }
//! ```

pub mod local;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;

/// Seen identities for one source, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredEntry", into = "Vec<String>")]
pub struct HistoryEntry {
    seen: Vec<String>,
}

/// On-disk shapes accepted for an entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    List(Vec<String>),
    Latest(String),
}

impl From<StoredEntry> for HistoryEntry {
    fn from(stored: StoredEntry) -> Self {
        match stored {
            StoredEntry::List(seen) => Self::from_iter(seen),
            StoredEntry::Latest(tag) => Self { seen: vec![tag] },
        }
    }
}

impl From<HistoryEntry> for Vec<String> {
    fn from(entry: HistoryEntry) -> Self {
        entry.seen
    }
}

impl FromIterator<String> for HistoryEntry {
    /// Collect identities, keeping the first occurrence of duplicates.
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut entry = Self::default();
        for identity in iter {
            if !entry.contains(&identity) {
                entry.seen.push(identity);
            }
        }
        entry
    }
}

impl HistoryEntry {
    pub fn contains(&self, identity: &str) -> bool {
        self.seen.iter().any(|s| s == identity)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    /// Append an identity and evict the oldest beyond the retention bound.
    ///
    /// Returns whether anything changed.
    pub fn record(&mut self, identity: &str, retention: &Retention) -> bool {
        let mut changed = false;
        if !self.contains(identity) {
            self.seen.push(identity.to_string());
            changed = true;
        }
        self.truncate(retention) || changed
    }

    /// Drop the oldest unpinned identities until at most `retention.max`
    /// remain. Pinned identities are never dropped, so the entry may stay
    /// above the bound. Returns whether any were dropped.
    pub fn truncate(&mut self, retention: &Retention) -> bool {
        let Some(mut excess) = self.seen.len().checked_sub(retention.max) else {
            return false;
        };
        let before = self.seen.len();
        self.seen.retain(|id| {
            if excess > 0 && !retention.is_pinned(id) {
                excess -= 1;
                false
            } else {
                true
            }
        });
        self.seen.len() != before
    }
}

/// Eviction bound for one source.
///
/// Identities the source still lists are pinned: evicting them would make
/// them new again on the next fetch.
#[derive(Debug, Clone, Default)]
pub struct Retention {
    max: usize,
    pinned: HashSet<String>,
}

impl Retention {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            pinned: HashSet::new(),
        }
    }

    /// Pin identities present in the current fetch.
    pub fn pinning<I, S>(mut self, identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pinned.extend(identities.into_iter().map(Into::into));
        self
    }

    fn is_pinned(&self, identity: &str) -> bool {
        self.pinned.contains(identity)
    }
}

/// Mapping from source name to its history, plus the set of sources changed
/// since load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStore {
    entries: BTreeMap<String, HistoryEntry>,
    dirty: BTreeSet<String>,
}

impl HistoryStore {
    /// Build a clean store from loaded entries.
    pub fn from_entries(entries: BTreeMap<String, HistoryEntry>) -> Self {
        Self {
            entries,
            dirty: BTreeSet::new(),
        }
    }

    pub fn entries(&self) -> &BTreeMap<String, HistoryEntry> {
        &self.entries
    }

    pub fn get(&self, source: &str) -> Option<&HistoryEntry> {
        self.entries.get(source)
    }

    /// Whether `identity` was already announced for `source`.
    pub fn contains(&self, source: &str, identity: &str) -> bool {
        self.get(source).is_some_and(|e| e.contains(identity))
    }

    /// Create the entry on first encounter and enforce its bound.
    pub fn ensure(&mut self, source: &str, retention: &Retention) -> &HistoryEntry {
        let entry = self.entries.entry(source.to_string()).or_default();
        if entry.truncate(retention) {
            self.dirty.insert(source.to_string());
        }
        entry
    }

    /// Record one identity for `source` under its retention bound.
    pub fn record(&mut self, source: &str, identity: &str, retention: &Retention) {
        let entry = self.entries.entry(source.to_string()).or_default();
        if entry.record(identity, retention) {
            self.dirty.insert(source.to_string());
        }
    }

    /// Whether any source changed since load.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_sources(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Overlay this store's changed sources onto `base`.
    pub fn merged_onto(&self, mut base: BTreeMap<String, HistoryEntry>) -> BTreeMap<String, HistoryEntry> {
        for name in &self.dirty {
            if let Some(entry) = self.entries.get(name) {
                base.insert(name.clone(), entry.clone());
            }
        }
        base
    }
}

/// Trait for history persistence backends.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Load the full store. Missing or unreadable state yields an empty store.
    async fn load(&self) -> HistoryStore;

    /// Write changed sources back. Returns `false` when there was nothing to write.
    async fn persist(&self, store: &HistoryStore) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_evicts_oldest() {
        let mut entry = HistoryEntry::default();
        for id in ["a", "b", "c", "d"] {
            entry.record(id, &Retention::new(3));
        }
        assert_eq!(entry.iter().collect::<Vec<_>>(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_record_existing_is_noop() {
        let mut entry: HistoryEntry = vec!["a".to_string()].into_iter().collect();
        assert!(!entry.record("a", &Retention::new(10)));
        assert_eq!(entry.len(), 1);
    }

    #[test]
    fn test_store_tracks_dirty_sources() {
        let mut store = HistoryStore::default();
        store.ensure("blog", &Retention::new(10));
        assert!(!store.is_dirty());

        store.record("blog", "post-1", &Retention::new(10));
        assert!(store.is_dirty());
        assert!(store.contains("blog", "post-1"));
        assert!(!store.contains("other", "post-1"));
        assert_eq!(store.dirty_sources().collect::<Vec<_>>(), vec!["blog"]);
    }

    #[test]
    fn test_ensure_truncates_oversized_entry() {
        let entry: HistoryEntry = (0..10).map(|i| i.to_string()).collect();
        let mut store = HistoryStore::from_entries(BTreeMap::from([("blog".to_string(), entry)]));
        assert_eq!(store.ensure("blog", &Retention::new(4)).len(), 4);
        assert!(store.is_dirty());
        assert!(store.contains("blog", "9"));
        assert!(!store.contains("blog", "0"));
    }

    #[test]
    fn test_truncate_spares_pinned_identities() {
        let mut entry: HistoryEntry = ["a", "b", "c", "d", "e"].map(String::from).into_iter().collect();
        let retention = Retention::new(2).pinning(["a", "b", "e"]);
        assert!(entry.truncate(&retention));
        assert_eq!(entry.iter().collect::<Vec<_>>(), vec!["a", "b", "e"]);

        // Nothing left to evict: the pinned set alone exceeds the bound.
        assert!(!entry.record("e", &retention));
        assert_eq!(entry.len(), 3);
    }

    #[test]
    fn test_entry_accepts_legacy_string() {
        let parsed: BTreeMap<String, HistoryEntry> =
            serde_json::from_str(r#"{"tool": "v1.2.0", "blog": ["a", "b", "a"]}"#).unwrap();
        assert_eq!(parsed["tool"].iter().collect::<Vec<_>>(), vec!["v1.2.0"]);
        assert_eq!(parsed["blog"].len(), 2);

        let json = serde_json::to_string(&parsed["tool"]).unwrap();
        assert_eq!(json, r#"["v1.2.0"]"#);
    }

    #[test]
    fn test_merged_onto_only_overlays_dirty() {
        let mut store = HistoryStore::default();
        store.ensure("untouched", &Retention::new(10));
        store.record("blog", "new", &Retention::new(10));

        let disk = BTreeMap::from([
            ("blog".to_string(), HistoryEntry::from_iter(["old".to_string()])),
            ("other".to_string(), HistoryEntry::from_iter(["x".to_string()])),
        ]);
        let merged = store.merged_onto(disk);
        assert_eq!(merged["blog"].iter().collect::<Vec<_>>(), vec!["new"]);
        assert!(merged.contains_key("other"));
        assert!(!merged.contains_key("untouched"));
    }
}

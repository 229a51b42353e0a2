//! Novelty filter.
//!
//! Computes which fetched items have not been announced for a source yet.
//! Pure: history is only read here, never mutated.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::models::Item;
use crate::storage::HistoryEntry;

/// Result of filtering one fetch against history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoveltyResult {
    /// Unseen items eligible for delivery, in adapter order
    pub candidates: Vec<Item>,
    /// Unseen items excluded only because their date is unknown
    pub undated: Vec<Item>,
    /// Unseen items older than the recency window
    pub stale: usize,
    /// Items already in history
    pub seen: usize,
    /// Repeated identities within the fetch (first occurrence kept)
    pub duplicates: usize,
}

impl NoveltyResult {
    /// Check if anything new was found.
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }
}

/// Filter for new-vs-seen decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoveltyFilter {
    /// Lookback window; `None` disables date filtering
    recency_window: Option<Duration>,
}

impl NoveltyFilter {
    /// Create a filter without date filtering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter that only accepts items newer than `now - window`.
    pub fn with_window(recency_window: Option<Duration>) -> Self {
        Self { recency_window }
    }

    /// Split fetched items into candidates and the rest.
    pub fn filter(
        &self,
        fetched: Vec<Item>,
        history: Option<&HistoryEntry>,
        now: DateTime<Utc>,
    ) -> NoveltyResult {
        let threshold = self.recency_window.map(|w| now - w);
        let mut in_fetch: HashSet<String> = HashSet::new();
        let mut result = NoveltyResult::default();

        for item in fetched {
            if !in_fetch.insert(item.identity.clone()) {
                result.duplicates += 1;
                continue;
            }
            if history.is_some_and(|h| h.contains(&item.identity)) {
                result.seen += 1;
                continue;
            }

            match (threshold, item.timestamp) {
                (None, _) => result.candidates.push(item),
                (Some(_), None) => result.undated.push(item),
                (Some(min), Some(ts)) if ts >= min => result.candidates.push(item),
                (Some(_), Some(_)) => result.stale += 1,
            }
        }

        result
    }
}

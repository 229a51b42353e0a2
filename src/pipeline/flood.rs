//! Flood guard.
//!
//! A first observation of a source, or a reset of its content, can surface
//! many "new" items at once. Above the threshold only the newest candidate
//! is delivered; the rest are recorded as seen without a notification.

use crate::models::Item;

/// Flood guard configuration.
#[derive(Debug, Clone)]
pub struct FloodGuardConfig {
    /// Largest candidate count delivered in full. Default: 3
    pub threshold: usize,
}

impl Default for FloodGuardConfig {
    fn default() -> Self {
        Self { threshold: 3 }
    }
}

/// Outcome of classifying one source's candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloodCheck {
    /// At or below the threshold: deliver everything
    Clear { to_deliver: Vec<Item> },
    /// Above the threshold: deliver the newest, suppress the rest
    Triggered {
        latest: Item,
        /// Suppressed items in chronological order
        suppressed: Vec<Item>,
    },
}

impl FloodCheck {
    /// Split into (items to deliver, items to mark seen silently).
    pub fn into_parts(self) -> (Vec<Item>, Vec<Item>) {
        match self {
            FloodCheck::Clear { to_deliver } => (to_deliver, Vec::new()),
            FloodCheck::Triggered { latest, suppressed } => (vec![latest], suppressed),
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, FloodCheck::Triggered { .. })
    }
}

/// Flood guard for bulk arrivals.
#[derive(Debug, Clone, Default)]
pub struct FloodGuard {
    config: FloodGuardConfig,
}

impl FloodGuard {
    /// Create a flood guard with the default threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flood guard with a custom threshold.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            config: FloodGuardConfig { threshold },
        }
    }

    pub fn threshold(&self) -> usize {
        self.config.threshold
    }

    /// Classify candidates. The same rule applies on a source's first run.
    pub fn classify(&self, candidates: Vec<Item>) -> FloodCheck {
        if candidates.len() <= self.config.threshold {
            return FloodCheck::Clear {
                to_deliver: candidates,
            };
        }

        let latest_idx = latest_index(&candidates);
        let mut rest = candidates;
        let latest = rest.remove(latest_idx);
        rest.sort_by(Item::chronological);

        log::warn!(
            "Flood guard: {} candidates > {}; delivering only '{}'",
            rest.len() + 1,
            self.config.threshold,
            latest.title
        );

        FloodCheck::Triggered {
            latest,
            suppressed: rest,
        }
    }
}

/// Index of the newest dated candidate; the first on ties.
///
/// With no dated candidate at all, the adapter's first item is taken, since
/// sources list newest first.
fn latest_index(candidates: &[Item]) -> usize {
    let mut best: Option<usize> = None;
    for (idx, item) in candidates.iter().enumerate() {
        let Some(ts) = item.timestamp else { continue };
        match best {
            Some(b) if candidates[b].timestamp >= Some(ts) => {}
            _ => best = Some(idx),
        }
    }
    best.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_items(count: usize) -> Vec<Item> {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                Item::new(format!("item_{i}"), format!("Item {i}"))
                    .with_timestamp(base + Duration::days(i as i64))
            })
            .collect()
    }

    #[test]
    fn test_clear_at_threshold() {
        let guard = FloodGuard::new();
        let check = guard.classify(make_items(3));
        assert!(!check.is_triggered());
        let (deliver, suppressed) = check.into_parts();
        assert_eq!(deliver.len(), 3);
        assert!(suppressed.is_empty());
    }

    #[test]
    fn test_empty_is_clear() {
        let (deliver, suppressed) = FloodGuard::new().classify(Vec::new()).into_parts();
        assert!(deliver.is_empty());
        assert!(suppressed.is_empty());
    }

    #[test]
    fn test_triggered_delivers_latest_only() {
        let mut items = make_items(5);
        items.reverse(); // newest first, like most feeds
        items.swap(1, 3);

        let check = FloodGuard::new().classify(items);
        assert!(check.is_triggered());
        let (deliver, suppressed) = check.into_parts();
        assert_eq!(deliver.len(), 1);
        assert_eq!(deliver[0].identity, "item_4");

        let suppressed_ids: Vec<_> = suppressed.iter().map(|i| i.identity.as_str()).collect();
        assert_eq!(suppressed_ids, vec!["item_0", "item_1", "item_2", "item_3"]);
    }

    #[test]
    fn test_undated_never_beats_dated() {
        let mut items = make_items(4);
        items.insert(0, Item::new("undated", "No date"));

        let (deliver, suppressed) = FloodGuard::new().classify(items).into_parts();
        assert_eq!(deliver[0].identity, "item_3");
        assert_eq!(suppressed.len(), 4);
        assert_eq!(suppressed.last().unwrap().identity, "undated");
    }

    #[test]
    fn test_all_undated_takes_first() {
        let items: Vec<Item> = (0..5).map(|i| Item::new(format!("u{i}"), "x")).collect();
        let (deliver, _) = FloodGuard::with_threshold(2).classify(items).into_parts();
        assert_eq!(deliver[0].identity, "u0");
    }

    #[test]
    fn test_custom_threshold() {
        let guard = FloodGuard::with_threshold(0);
        assert_eq!(guard.threshold(), 0);
        assert!(guard.classify(make_items(1)).is_triggered());
        let (deliver, suppressed) = guard.classify(make_items(2)).into_parts();
        assert_eq!(deliver.len(), 1);
        assert_eq!(suppressed.len(), 1);
    }
}

//! The normalized unit of content crossing the adapter boundary.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{date::parse_timestamp, strip_html};

/// Extras key for a video id (feed items from video channels).
pub const EXTRA_VIDEO_ID: &str = "video_id";
/// Extras key for a thumbnail/card image.
pub const EXTRA_IMAGE_URL: &str = "image_url";
/// Extras key for a paper PDF link.
pub const EXTRA_PDF_URL: &str = "pdf_url";
/// Extras key for a release tag.
pub const EXTRA_TAG: &str = "tag";

/// A record as an adapter extracted it, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Explicit entry id (feed guid/id, release tag, paper short id)
    pub id: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    /// Publication time as written by the source
    pub published: Option<String>,
    /// Summary, possibly containing markup
    pub summary: Option<String>,
    pub tags: Vec<String>,
    /// Adapter-specific values only the renderer reads
    pub extras: BTreeMap<String, String>,
}

/// A normalized content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable key used for seen/unseen decisions within one source
    pub identity: String,
    pub title: String,
    pub link: String,
    /// `None` when the source gave no parseable date
    pub timestamp: Option<DateTime<Utc>>,
    pub summary: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

impl Item {
    /// Create an item with only an identity and a title.
    pub fn new(identity: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            title: title.into(),
            link: String::new(),
            timestamp: None,
            summary: String::new(),
            tags: Vec::new(),
            extras: BTreeMap::new(),
        }
    }

    /// Set the publication time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Normalize an adapter record. Returns `None` when no identity can be derived.
    pub fn from_raw(raw: RawEntry) -> Option<Self> {
        let link = non_empty(raw.link);
        let identity = non_empty(raw.id).or_else(|| link.clone())?;

        Some(Self {
            identity,
            title: non_empty(raw.title.map(|t| strip_html(&t)))
                .unwrap_or_else(|| "No Title".to_string()),
            link: link.unwrap_or_default(),
            timestamp: raw.published.as_deref().and_then(parse_timestamp),
            summary: raw.summary.map(|s| strip_html(&s)).unwrap_or_default(),
            tags: raw
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            extras: raw.extras,
        })
    }

    /// Chronological order with unknown timestamps after every known one.
    pub fn chronological(a: &Item, b: &Item) -> Ordering {
        match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Look up an adapter extra.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(id: Option<&str>, link: Option<&str>) -> RawEntry {
        RawEntry {
            id: id.map(String::from),
            link: link.map(String::from),
            title: Some("  <b>Hello</b>  ".to_string()),
            published: Some("2025-01-02T03:04:05Z".to_string()),
            summary: Some("<p>Body</p>".to_string()),
            tags: vec!["rust".into(), " ".into()],
            ..RawEntry::default()
        }
    }

    #[test]
    fn test_identity_prefers_id_then_link() {
        let item = Item::from_raw(raw(Some("urn:1"), Some("https://x/1"))).unwrap();
        assert_eq!(item.identity, "urn:1");
        assert_eq!(item.link, "https://x/1");

        let item = Item::from_raw(raw(None, Some("https://x/1"))).unwrap();
        assert_eq!(item.identity, "https://x/1");

        let item = Item::from_raw(raw(Some("  "), Some("https://x/2"))).unwrap();
        assert_eq!(item.identity, "https://x/2");
    }

    #[test]
    fn test_missing_identity_is_dropped() {
        assert!(Item::from_raw(raw(None, None)).is_none());
        assert!(Item::from_raw(raw(Some(""), Some(" "))).is_none());
    }

    #[test]
    fn test_normalizes_fields() {
        let item = Item::from_raw(raw(Some("a"), None)).unwrap();
        assert_eq!(item.title, "Hello");
        assert_eq!(item.summary, "Body");
        assert_eq!(item.tags, vec!["rust".to_string()]);
        assert_eq!(
            item.timestamp,
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap())
        );
    }

    #[test]
    fn test_unparseable_date_is_unknown() {
        let mut r = raw(Some("a"), None);
        r.published = Some("soon".into());
        assert_eq!(Item::from_raw(r).unwrap().timestamp, None);
    }

    #[test]
    fn test_unknown_sorts_last() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut items = vec![
            Item::new("u", "unknown"),
            Item::new("b", "b").with_timestamp(t + chrono::Duration::hours(1)),
            Item::new("a", "a").with_timestamp(t),
        ];
        items.sort_by(Item::chronological);
        let ids: Vec<_> = items.iter().map(|i| i.identity.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "u"]);
    }
}

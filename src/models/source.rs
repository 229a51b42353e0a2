//! Source definitions.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// The closed set of adapter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS 2.0 or Atom feed (blogs, video channels)
    Feed,
    /// HTML page with embedded structured data
    Page,
    /// Latest tagged release of a repository
    Release,
    /// Paper search API
    Search,
}

impl SourceKind {
    /// Whether sources of this kind apply a recency window unless told otherwise.
    pub fn default_recency_window(self) -> bool {
        matches!(self, SourceKind::Feed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Feed => "feed",
            SourceKind::Page => "page",
            SourceKind::Release => "release",
            SourceKind::Search => "search",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction strategy for `page` sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Next.js flight payloads pushed through `self.__next_f.push(...)`
    #[default]
    NextFlight,
}

/// One configured source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique name; also the history key
    pub name: String,

    /// Adapter type
    pub kind: SourceKind,

    /// Document URL (feed, page)
    #[serde(default)]
    pub url: Option<String>,

    /// `owner/name` (release)
    #[serde(default)]
    pub repo: Option<String>,

    /// Search query (search)
    #[serde(default)]
    pub query: Option<String>,

    /// Whole-word keywords a candidate must contain (optional)
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Result page size (search)
    #[serde(default = "defaults::max_results")]
    pub max_results: usize,

    /// Extraction strategy (page)
    #[serde(default)]
    pub extractor: ExtractorKind,

    /// Base for links built from slugs (page)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Base check interval in hours
    #[serde(default = "defaults::interval_hours")]
    pub interval_hours: u32,

    /// Override for the per-kind recency window default
    #[serde(default)]
    pub recency_window: Option<bool>,

    /// Override for `history.max_entries`
    #[serde(default)]
    pub max_history: Option<usize>,

    /// Instant View template hash (feed)
    #[serde(default)]
    pub instant_view_hash: Option<String>,

    /// Override for the notifier's per-kind topic
    #[serde(default)]
    pub topic: Option<String>,
}

impl SourceConfig {
    /// Create a source with defaults for everything but name and kind.
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
            repo: None,
            query: None,
            keywords: Vec::new(),
            max_results: defaults::max_results(),
            extractor: ExtractorKind::default(),
            base_url: None,
            interval_hours: defaults::interval_hours(),
            recency_window: None,
            max_history: None,
            instant_view_hash: None,
            topic: None,
        }
    }

    /// Sources checked more often than once a day.
    pub fn is_frequent(&self) -> bool {
        self.interval_hours < 24
    }

    /// Lookback window for the novelty filter, if this source uses one.
    ///
    /// The window exceeds the check interval by `multiplier` so a delayed or
    /// missed run does not lose items.
    pub fn recency_window(&self, multiplier: u32) -> Option<Duration> {
        let enabled = self
            .recency_window
            .unwrap_or_else(|| self.kind.default_recency_window());
        enabled.then(|| Duration::hours(i64::from(self.interval_hours) * i64::from(multiplier)))
    }

    /// Check that the fields this kind needs are present.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("source name is empty"));
        }
        if self.interval_hours == 0 {
            return Err(AppError::validation(format!(
                "source '{}': interval_hours must be > 0",
                self.name
            )));
        }
        if self.max_history == Some(0) {
            return Err(AppError::validation(format!(
                "source '{}': max_history must be > 0",
                self.name
            )));
        }

        let missing = match self.kind {
            SourceKind::Feed | SourceKind::Page if blank(&self.url) => Some("url"),
            SourceKind::Page if blank(&self.base_url) => Some("base_url"),
            SourceKind::Release if blank(&self.repo) => Some("repo"),
            SourceKind::Search if blank(&self.query) => Some("query"),
            _ => None,
        };
        if let Some(field) = missing {
            return Err(AppError::validation(format!(
                "source '{}' ({}) requires '{}'",
                self.name, self.kind, field
            )));
        }

        if self.kind == SourceKind::Release {
            let repo = self.repo.as_deref().unwrap_or_default();
            if repo.split('/').filter(|p| !p.is_empty()).count() != 2 {
                return Err(AppError::validation(format!(
                    "source '{}': repo must look like owner/name, got '{}'",
                    self.name, repo
                )));
            }
        }
        if self.kind == SourceKind::Search && self.max_results == 0 {
            return Err(AppError::validation(format!(
                "source '{}': max_results must be > 0",
                self.name
            )));
        }
        Ok(())
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

mod defaults {
    pub fn max_results() -> usize {
        100
    }
    pub fn interval_hours() -> u32 {
        24
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_window_defaults_by_kind() {
        let mut feed = SourceConfig::new("blog", SourceKind::Feed);
        feed.interval_hours = 4;
        assert_eq!(feed.recency_window(3), Some(Duration::hours(12)));

        let page = SourceConfig::new("page", SourceKind::Page);
        assert_eq!(page.recency_window(3), None);

        feed.recency_window = Some(false);
        assert_eq!(feed.recency_window(3), None);
    }

    #[test]
    fn test_validate_requires_kind_fields() {
        let feed = SourceConfig::new("blog", SourceKind::Feed);
        assert!(feed.validate().is_err());

        let mut release = SourceConfig::new("tool", SourceKind::Release);
        release.repo = Some("owner".into());
        assert!(release.validate().is_err());
        release.repo = Some("owner/tool".into());
        assert!(release.validate().is_ok());

        let mut page = SourceConfig::new("eng", SourceKind::Page);
        page.url = Some("https://example.com/engineering".into());
        assert!(page.validate().is_err());
        page.base_url = Some("https://example.com".into());
        assert!(page.validate().is_ok());
    }

    #[test]
    fn test_kind_deserializes_from_lowercase() {
        let src: SourceConfig = toml::from_str(
            r#"
            name = "papers"
            kind = "search"
            query = "cat:cs.LG"
            keywords = ["diffusion"]
            "#,
        )
        .unwrap();
        assert_eq!(src.kind, SourceKind::Search);
        assert_eq!(src.max_results, 100);
        assert_eq!(src.interval_hours, 24);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let parsed: std::result::Result<SourceConfig, _> = toml::from_str(
            r#"
            name = "x"
            kind = "podcast"
            "#,
        );
        assert!(parsed.is_err());
    }
}

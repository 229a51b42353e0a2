//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{SourceConfig, SourceKind};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings shared by all adapters
    #[serde(default)]
    pub http: HttpConfig,

    /// History persistence settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Delivery budget, flood threshold and pacing
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Time-of-day gating and lookback sizing
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Notification channel settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Sources, evaluated in this order
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is a configuration error; there is no usable default
    /// source list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.history.max_entries == 0 {
            return Err(AppError::validation("history.max_entries must be > 0"));
        }
        if self.dispatch.budget == 0 {
            return Err(AppError::validation("dispatch.budget must be > 0"));
        }
        if self.schedule.lookback_multiplier == 0 {
            return Err(AppError::validation(
                "schedule.lookback_multiplier must be > 0",
            ));
        }
        self.schedule.tz()?;
        if let Some(window) = &self.schedule.daily_window {
            window.validate()?;
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// History bound for a source.
    pub fn max_history_for(&self, source: &SourceConfig) -> usize {
        source.max_history.unwrap_or(self.history.max_entries)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// History persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// JSON file holding seen identities per source
    #[serde(default = "defaults::history_path")]
    pub path: String,

    /// Identities retained per source; oldest are evicted first
    #[serde(default = "defaults::max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: defaults::history_path(),
            max_entries: defaults::max_entries(),
        }
    }
}

/// Delivery policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Notifications allowed per run across all sources
    #[serde(default = "defaults::budget")]
    pub budget: usize,

    /// Candidate count above which only the newest item is delivered
    #[serde(default = "defaults::flood_threshold")]
    pub flood_threshold: usize,

    /// Pause after each successful delivery, in milliseconds
    #[serde(default = "defaults::pause_ms")]
    pub pause_ms: u64,

    /// What to do with undated candidates when a recency window applies
    #[serde(default)]
    pub undated: UndatedPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            budget: defaults::budget(),
            flood_threshold: defaults::flood_threshold(),
            pause_ms: defaults::pause_ms(),
            undated: UndatedPolicy::default(),
        }
    }
}

/// Handling of candidates without a usable date under a recency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndatedPolicy {
    /// Record silently so they are never retried
    #[default]
    MarkSeen,
    /// Leave untouched; reconsidered on the next run
    Retry,
}

/// Scheduling policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone for the daily window and displayed dates
    #[serde(default = "defaults::timezone")]
    pub timezone: String,

    /// Lookback window = interval × multiplier
    #[serde(default = "defaults::lookback_multiplier")]
    pub lookback_multiplier: u32,

    /// Local hours during which daily sources run
    #[serde(default)]
    pub daily_window: Option<DailyWindow>,
}

impl ScheduleConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| AppError::validation(format!("schedule.timezone: {e}")))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: defaults::timezone(),
            lookback_multiplier: defaults::lookback_multiplier(),
            daily_window: None,
        }
    }
}

/// Half-open local hour range `[start_hour, end_hour)`; may wrap midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl DailyWindow {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    fn validate(&self) -> Result<()> {
        if self.start_hour > 23 || self.end_hour > 24 || self.start_hour == self.end_hour {
            return Err(AppError::validation(format!(
                "schedule.daily_window {}..{} is not a valid hour range",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }
}

/// Notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub feed_topic: Option<String>,
    #[serde(default)]
    pub page_topic: Option<String>,
    #[serde(default)]
    pub release_topic: Option<String>,
    #[serde(default)]
    pub search_topic: Option<String>,

    /// Summary length in words
    #[serde(default = "defaults::summary_words")]
    pub summary_words: usize,
}

impl NotifierConfig {
    /// Topic (message thread) for a source: its own override, else the kind's.
    pub fn topic_for(&self, source: &SourceConfig) -> Option<String> {
        source.topic.clone().or_else(|| match source.kind {
            SourceKind::Feed => self.feed_topic.clone(),
            SourceKind::Page => self.page_topic.clone(),
            SourceKind::Release => self.release_topic.clone(),
            SourceKind::Search => self.search_topic.clone(),
        })
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            feed_topic: None,
            page_topic: None,
            release_topic: None,
            search_topic: None,
            summary_words: defaults::summary_words(),
        }
    }
}

mod defaults {
    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; feedwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // History defaults
    pub fn history_path() -> String {
        "history.json".into()
    }
    pub fn max_entries() -> usize {
        50
    }

    // Dispatch defaults
    pub fn budget() -> usize {
        5
    }
    pub fn flood_threshold() -> usize {
        3
    }
    pub fn pause_ms() -> u64 {
        1000
    }

    // Schedule defaults
    pub fn timezone() -> String {
        "UTC".into()
    }
    pub fn lookback_multiplier() -> u32 {
        3
    }

    // Notifier defaults
    pub fn summary_words() -> usize {
        50
    }
}

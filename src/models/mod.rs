// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the data structures shared by adapters, the
//! change-detection pipeline and the notifier.

mod config;
mod item;
mod source;

// Re-export all public types
pub use config::{
    Config, DailyWindow, DispatchConfig, HistoryConfig, HttpConfig, NotifierConfig,
    ScheduleConfig, UndatedPolicy,
};
pub use item::{EXTRA_IMAGE_URL, EXTRA_PDF_URL, EXTRA_TAG, EXTRA_VIDEO_ID, Item, RawEntry};
pub use source::{ExtractorKind, SourceConfig, SourceKind};

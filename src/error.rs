// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// XML document could not be read
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration or credentials absent/unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A source could not be fetched
    #[error("Fetch error for {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// A fetched document did not contain the expected structure
    #[error("Extraction error for {source_name}: {message}")]
    Extract {
        source_name: String,
        message: String,
    },

    /// The notification transport rejected a message
    #[error("Delivery error: {0}")]
    Delivery(String),
}

/// Failure classes with distinct recovery actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Abort the run before any source is processed.
    Configuration,
    /// Skip the source for this run; no history mutation.
    Fetch,
    /// Skip the source for this run; no history mutation.
    Extraction,
    /// Leave the item unseen; retried next run.
    Delivery,
    /// Anything else (local I/O, serialization).
    Internal,
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a named source.
    pub fn fetch(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error for a named source.
    pub fn extract(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extract {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Create a delivery error.
    pub fn delivery(message: impl fmt::Display) -> Self {
        Self::Delivery(message.to_string())
    }

    /// Classify this error by the recovery action it calls for.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Toml(_) => FailureKind::Configuration,
            Self::Http(_) | Self::Url(_) | Self::Fetch { .. } => FailureKind::Fetch,
            Self::Xml(_) | Self::Json(_) | Self::Extract { .. } => FailureKind::Extraction,
            Self::Delivery(_) => FailureKind::Delivery,
            Self::Io(_) => FailureKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            AppError::fetch("blog", "timed out").failure_kind(),
            FailureKind::Fetch
        );
        assert_eq!(
            AppError::extract("blog", "no article list").failure_kind(),
            FailureKind::Extraction
        );
        assert_eq!(
            AppError::config("missing token").failure_kind(),
            FailureKind::Configuration
        );
        assert_eq!(
            AppError::delivery("429").failure_kind(),
            FailureKind::Delivery
        );
    }

    #[test]
    fn test_display_includes_source() {
        let err = AppError::fetch("Rust Blog", "connection reset");
        assert_eq!(
            err.to_string(),
            "Fetch error for Rust Blog: connection reset"
        );
    }
}

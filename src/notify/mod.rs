//! Notification delivery.
//!
//! The pipeline only needs one capability: deliver one item and report
//! whether it went through.

pub mod render;
pub mod telegram;

use async_trait::async_trait;

use crate::models::{Item, SourceConfig};

pub use render::{Message, Renderer};
pub use telegram::TelegramNotifier;

/// Delivers one rendered item.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns `true` when the transport accepted the message.
    async fn notify(&self, item: &Item, source: &SourceConfig) -> bool;
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone, Copy)]
pub struct DryRunNotifier {
    renderer: Renderer,
}

impl DryRunNotifier {
    pub fn new(renderer: Renderer) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Notifier for DryRunNotifier {
    async fn notify(&self, item: &Item, source: &SourceConfig) -> bool {
        let message = self.renderer.render(item, source);
        log::info!("[{}] (dry run) would send:\n{}", source.name, message.text);
        true
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// Records delivered identities; rejects the configured ones.
    #[derive(Default)]
    pub struct RecordingNotifier {
        delivered: Mutex<Vec<String>>,
        attempts: Mutex<usize>,
        rejected: HashSet<String>,
    }

    impl RecordingNotifier {
        pub fn failing(identities: &[&str]) -> Self {
            Self {
                rejected: identities.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn delivered_ids(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }

        pub fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, item: &Item, _source: &SourceConfig) -> bool {
            *self.attempts.lock().unwrap() += 1;
            if self.rejected.contains(&item.identity) {
                return false;
            }
            self.delivered.lock().unwrap().push(item.identity.clone());
            true
        }
    }
}

//! Dispatch scheduler.
//!
//! Delivers a source's surviving candidates oldest first against the run's
//! notification budget, pausing after each successful delivery.

use std::time::Duration;

use crate::models::{Item, SourceConfig};
use crate::notify::Notifier;

/// Cap on notifications sent during one run, shared by all sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBudget {
    limit: usize,
    sent: usize,
}

impl RunBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, sent: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.sent)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Count one successful notification.
    fn consume(&mut self) {
        self.sent += 1;
    }
}

/// What happened to one item handed to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The notifier accepted it
    Delivered,
    /// The notifier rejected it; retried next run
    Failed,
    /// Not attempted because the budget ran out
    Deferred,
}

/// Per-item outcomes of one dispatch, in delivery order.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<(Item, Delivery)>,
}

impl DispatchReport {
    pub fn count(&self, kind: Delivery) -> usize {
        self.outcomes.iter().filter(|(_, d)| *d == kind).count()
    }

    /// Items the notifier accepted.
    pub fn delivered(&self) -> impl Iterator<Item = &Item> {
        self.outcomes
            .iter()
            .filter(|(_, d)| *d == Delivery::Delivered)
            .map(|(item, _)| item)
    }
}

/// Scheduler that paces deliveries.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    pause: Duration,
}

impl Dispatcher {
    pub fn new(pause: Duration) -> Self {
        Self { pause }
    }

    /// Deliver `to_deliver` for one source in ascending timestamp order.
    pub async fn dispatch(
        &self,
        mut to_deliver: Vec<Item>,
        source: &SourceConfig,
        budget: &mut RunBudget,
        notifier: &dyn Notifier,
    ) -> DispatchReport {
        // Stable: equal or unknown timestamps keep their incoming order.
        to_deliver.sort_by(Item::chronological);

        let mut report = DispatchReport::default();
        let mut items = to_deliver.into_iter();
        let mut pause_pending = false;

        while let Some(item) = items.next() {
            if budget.is_exhausted() {
                log::info!(
                    "[{}] Notification budget exhausted; deferring remaining items",
                    source.name
                );
                report.outcomes.push((item, Delivery::Deferred));
                report
                    .outcomes
                    .extend(items.by_ref().map(|rest| (rest, Delivery::Deferred)));
                break;
            }

            // Pace only between deliveries, never after the last attempt.
            if pause_pending && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            pause_pending = false;

            if notifier.notify(&item, source).await {
                budget.consume();
                log::info!("[{}] Delivered: {}", source.name, item.title);
                report.outcomes.push((item, Delivery::Delivered));
                pause_pending = true;
            } else {
                log::warn!(
                    "[{}] Delivery failed, will retry next run: {}",
                    source.name,
                    item.title
                );
                report.outcomes.push((item, Delivery::Failed));
            }
        }

        report
    }
}

//! Run orchestrator.
//!
//! One invocation: load history, walk the configured sources in order
//! (gate, fetch, filter, guard, dispatch), then persist history once at the
//! end if anything changed.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{AppError, FailureKind, Result};
use crate::models::{Config, Item, SourceConfig, UndatedPolicy};
use crate::notify::Notifier;
use crate::services::SourceFetcher;
use crate::storage::{HistoryStorage, HistoryStore, Retention};

use super::dispatch::{Delivery, Dispatcher, RunBudget};
use super::flood::FloodGuard;
use super::keywords::KeywordGate;
use super::novelty::NoveltyFilter;
use super::schedule::{Gate, RunMode, SchedulePolicy};

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Process everything but never write history
    pub dry_run: bool,
}

/// Why a source produced no deliveries, or that it was processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Processed,
    /// Gated out before fetching
    Skipped(Gate),
    /// Fetch or extraction failed; history untouched
    Failed { kind: FailureKind, message: String },
    /// The run budget ran out before this source was reached
    NotReached,
}

/// Counters for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub name: String,
    pub status: SourceStatus,
    pub fetched: usize,
    pub candidates: usize,
    pub delivered: usize,
    pub failed: usize,
    pub deferred: usize,
    /// Marked seen without a notification (flood guard)
    pub suppressed: usize,
    /// Marked seen without a notification (keyword gate)
    pub unmatched: usize,
    /// Marked seen without a notification (unknown date)
    pub undated: usize,
}

impl SourceReport {
    fn new(name: &str, status: SourceStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            fetched: 0,
            candidates: 0,
            delivered: 0,
            failed: 0,
            deferred: 0,
            suppressed: 0,
            unmatched: 0,
            undated: 0,
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub budget_exhausted: bool,
    /// Whether history was written
    pub persisted: bool,
}

impl RunReport {
    pub fn delivered(&self) -> usize {
        self.sources.iter().map(|s| s.delivered).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.status, SourceStatus::Failed { .. }))
            .count()
    }
}

/// Drives one run across all configured sources.
pub struct Orchestrator<'a> {
    config: &'a Config,
    fetcher: &'a dyn SourceFetcher,
    notifier: &'a dyn Notifier,
    storage: &'a dyn HistoryStorage,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        fetcher: &'a dyn SourceFetcher,
        notifier: &'a dyn Notifier,
        storage: &'a dyn HistoryStorage,
    ) -> Self {
        Self {
            config,
            fetcher,
            notifier,
            storage,
        }
    }

    /// Run every source once at `now`.
    ///
    /// Only configuration problems and a failed history write surface as
    /// errors; per-source failures are logged and recorded in the report.
    pub async fn run(&self, options: RunOptions, now: DateTime<Utc>) -> Result<RunReport> {
        let schedule = &self.config.schedule;
        let policy = SchedulePolicy::new(options.mode, schedule.tz()?, schedule.daily_window);
        let dispatcher = Dispatcher::new(Duration::from_millis(self.config.dispatch.pause_ms));
        let mut budget = RunBudget::new(self.config.dispatch.budget);

        log::info!(
            "Run starting: mode={}, {} sources, budget={}{}",
            options.mode,
            self.config.sources.len(),
            self.config.dispatch.budget,
            if options.dry_run { " (dry run)" } else { "" }
        );

        let mut history = self.storage.load().await;
        let mut report = RunReport::default();

        for source in &self.config.sources {
            if budget.is_exhausted() {
                log::info!("[{}] Not reached: notification budget exhausted", source.name);
                report
                    .sources
                    .push(SourceReport::new(&source.name, SourceStatus::NotReached));
                continue;
            }

            let gate = policy.gate(source, now);
            if !gate.is_run() {
                log::info!("[{}] Skipped: {:?}", source.name, gate);
                report
                    .sources
                    .push(SourceReport::new(&source.name, SourceStatus::Skipped(gate)));
                continue;
            }

            let source_report = match self
                .process_source(source, &mut history, &dispatcher, &mut budget, now)
                .await
            {
                Ok(source_report) => source_report,
                Err(e) => {
                    let kind = e.failure_kind();
                    match kind {
                        FailureKind::Fetch => log::warn!("[{}] Fetch failed: {}", source.name, e),
                        FailureKind::Extraction => {
                            log::warn!("[{}] Extraction failed: {}", source.name, e)
                        }
                        _ => log::error!("[{}] Skipped after error: {}", source.name, e),
                    }
                    SourceReport::new(
                        &source.name,
                        SourceStatus::Failed {
                            kind,
                            message: e.to_string(),
                        },
                    )
                }
            };
            report.sources.push(source_report);
        }

        report.budget_exhausted = budget.is_exhausted();

        if options.dry_run {
            log::info!("Dry run: history not written");
        } else {
            report.persisted = self.storage.persist(&history).await?;
        }

        log::info!(
            "Run complete: {} delivered, {} sources failed, budget remaining {}",
            report.delivered(),
            report.failed_sources(),
            budget.remaining()
        );
        Ok(report)
    }

    /// Fetch, filter, guard and dispatch one source.
    ///
    /// Nothing is written to `history` unless the fetch succeeded.
    async fn process_source(
        &self,
        source: &SourceConfig,
        history: &mut HistoryStore,
        dispatcher: &Dispatcher,
        budget: &mut RunBudget,
        now: DateTime<Utc>,
    ) -> Result<SourceReport> {
        let gate = KeywordGate::new(&source.keywords)?;
        let raw = self.fetcher.fetch(source).await?;

        let name = source.name.as_str();
        let mut report = SourceReport::new(name, SourceStatus::Processed);
        report.fetched = raw.len();

        let items: Vec<Item> = raw.into_iter().filter_map(Item::from_raw).collect();
        if items.len() < report.fetched {
            log::debug!(
                "[{}] Dropped {} entries without identity",
                name,
                report.fetched - items.len()
            );
        }

        // Identities still listed upstream must survive eviction, or they
        // come back as candidates on the next run.
        let retention = Retention::new(self.config.max_history_for(source))
            .pinning(items.iter().map(|item| item.identity.clone()));
        history.ensure(name, &retention);
        let window = source.recency_window(self.config.schedule.lookback_multiplier);
        let novelty = NoveltyFilter::with_window(window).filter(items, history.get(name), now);
        log::info!(
            "[{}] {} fetched, {} new, {} seen, {} outside window",
            name,
            report.fetched,
            novelty.candidates.len(),
            novelty.seen,
            novelty.stale
        );

        if !novelty.undated.is_empty() {
            match self.config.dispatch.undated {
                UndatedPolicy::MarkSeen => {
                    log::info!(
                        "[{}] Marking {} undated items seen",
                        name,
                        novelty.undated.len()
                    );
                    for item in &novelty.undated {
                        history.record(name, &item.identity, &retention);
                    }
                    report.undated = novelty.undated.len();
                }
                UndatedPolicy::Retry => log::debug!(
                    "[{}] Leaving {} undated items for a later run",
                    name,
                    novelty.undated.len()
                ),
            }
        }

        let (matched, unmatched) = gate.split(novelty.candidates);
        if !unmatched.is_empty() {
            log::debug!("[{}] {} items matched no keyword", name, unmatched.len());
        }
        for item in &unmatched {
            history.record(name, &item.identity, &retention);
        }
        report.unmatched = unmatched.len();
        report.candidates = matched.len();

        let flood = FloodGuard::with_threshold(self.config.dispatch.flood_threshold);
        let (to_deliver, suppressed) = flood.classify(matched).into_parts();
        for item in &suppressed {
            history.record(name, &item.identity, &retention);
        }
        report.suppressed = suppressed.len();

        let dispatched = dispatcher
            .dispatch(to_deliver, source, budget, self.notifier)
            .await;
        for item in dispatched.delivered() {
            history.record(name, &item.identity, &retention);
        }
        report.delivered = dispatched.count(Delivery::Delivered);
        report.failed = dispatched.count(Delivery::Failed);
        report.deferred = dispatched.count(Delivery::Deferred);

        Ok(report)
    }
}

/// Reject a run up front when the configuration cannot drive one.
pub fn preflight(config: &Config) -> Result<()> {
    config.validate()?;
    for source in &config.sources {
        KeywordGate::new(&source.keywords).map_err(|e| {
            AppError::config(format!("source '{}': {}", source.name, e))
        })?;
    }
    Ok(())
}

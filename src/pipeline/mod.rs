//! Change-detection and dispatch pipeline.
//!
//! - `novelty`: new-vs-seen decisions against history
//! - `keywords`: optional keyword gate for search sources
//! - `flood`: bulk-arrival guard
//! - `dispatch`: ordered, budgeted, paced delivery
//! - `schedule`: run mode and time-of-day gating
//! - `run`: the orchestrator tying it together

pub mod dispatch;
pub mod flood;
pub mod keywords;
pub mod novelty;
pub mod run;
pub mod schedule;

pub use dispatch::{Delivery, DispatchReport, Dispatcher, RunBudget};
pub use flood::{FloodCheck, FloodGuard, FloodGuardConfig};
pub use keywords::KeywordGate;
pub use novelty::{NoveltyFilter, NoveltyResult};
pub use run::{Orchestrator, RunOptions, RunReport, SourceReport, SourceStatus, preflight};
pub use schedule::{Gate, RunMode, SchedulePolicy};

//! Per-source scheduling policy.
//!
//! Decides, before anything is fetched, whether a source takes part in this
//! run. A skipped source is not fetched and its history is left alone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::{AppError, Result};
use crate::models::{DailyWindow, SourceConfig};

/// Which subset of the configured sources a run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Every source
    #[default]
    All,
    /// Only sources checked more often than daily
    Frequent,
}

impl FromStr for RunMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(RunMode::All),
            "frequent" => Ok(RunMode::Frequent),
            other => Err(AppError::config(format!(
                "unknown run mode '{other}' (expected 'all' or 'frequent')"
            ))),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::All => f.write_str("all"),
            RunMode::Frequent => f.write_str("frequent"),
        }
    }
}

/// Outcome of gating one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Run,
    /// Excluded by the run mode
    SkipMode,
    /// Daily source outside its time-of-day window
    SkipOutsideWindow { local_hour: u32 },
}

impl Gate {
    pub fn is_run(self) -> bool {
        self == Gate::Run
    }
}

/// Mode and time-of-day gate evaluated once per source.
#[derive(Debug, Clone, Copy)]
pub struct SchedulePolicy {
    mode: RunMode,
    tz: Tz,
    daily_window: Option<DailyWindow>,
}

impl SchedulePolicy {
    pub fn new(mode: RunMode, tz: Tz, daily_window: Option<DailyWindow>) -> Self {
        Self {
            mode,
            tz,
            daily_window,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Gate a source at `now`.
    pub fn gate(&self, source: &SourceConfig, now: DateTime<Utc>) -> Gate {
        if source.is_frequent() {
            return Gate::Run;
        }
        if self.mode == RunMode::Frequent {
            return Gate::SkipMode;
        }
        match self.daily_window {
            Some(window) => {
                let local_hour = now.with_timezone(&self.tz).hour();
                if window.contains(local_hour) {
                    Gate::Run
                } else {
                    Gate::SkipOutsideWindow { local_hour }
                }
            }
            None => Gate::Run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::TimeZone;

    fn source(interval_hours: u32) -> SourceConfig {
        let mut source = SourceConfig::new("s", SourceKind::Feed);
        source.interval_hours = interval_hours;
        source
    }

    fn at_utc_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, 15, 0).unwrap()
    }

    #[test]
    fn test_parse_run_mode() {
        assert_eq!("all".parse::<RunMode>().unwrap(), RunMode::All);
        assert_eq!(" Frequent ".parse::<RunMode>().unwrap(), RunMode::Frequent);
        assert!("hourly".parse::<RunMode>().is_err());
        assert_eq!(RunMode::Frequent.to_string(), "frequent");
    }

    #[test]
    fn test_frequent_mode_skips_daily_sources() {
        let policy = SchedulePolicy::new(RunMode::Frequent, Tz::UTC, None);
        assert_eq!(policy.gate(&source(4), at_utc_hour(3)), Gate::Run);
        assert_eq!(policy.gate(&source(24), at_utc_hour(3)), Gate::SkipMode);
    }

    #[test]
    fn test_daily_window_in_local_time() {
        let window = DailyWindow {
            start_hour: 8,
            end_hour: 10,
        };
        let policy = SchedulePolicy::new(RunMode::All, chrono_tz::Asia::Seoul, Some(window));

        // 23:15 UTC is 08:15 in Seoul.
        assert!(policy.gate(&source(24), at_utc_hour(23)).is_run());
        assert_eq!(
            policy.gate(&source(24), at_utc_hour(12)),
            Gate::SkipOutsideWindow { local_hour: 21 }
        );
        // Frequent sources ignore the window.
        assert!(policy.gate(&source(6), at_utc_hour(12)).is_run());
    }

    #[test]
    fn test_no_window_always_runs() {
        let policy = SchedulePolicy::new(RunMode::All, Tz::UTC, None);
        assert!(policy.gate(&source(168), at_utc_hour(5)).is_run());
    }
}

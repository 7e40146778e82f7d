//! Date window for NED queries
//!
//! The API filters on `validfrom` by calendar date, so the window is computed
//! from the date `now` falls on: one day of lookback and `window_days` ahead.
//! In local-timezone mode that date is taken in the host timezone, which moves
//! both bounds by a day around midnight.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Which clock the window's calendar dates are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezoneMode {
    Utc,
    Local(Tz),
}

impl TimezoneMode {
    /// Map the `local_tz_filter` option onto a mode using the host timezone
    pub fn from_flag(local_tz: bool, host_tz: Tz) -> Self {
        if local_tz {
            Self::Local(host_tz)
        } else {
            Self::Utc
        }
    }

    pub fn is_local(self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Label recorded in fetch metadata
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utc => "utc",
            Self::Local(_) => "local",
        }
    }

    /// Value of the `granularitytimezone` query parameter
    pub fn granularity_timezone(self) -> u8 {
        u8::from(self.is_local())
    }

    fn date_of(self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Utc => now.date_naive(),
            Self::Local(tz) => now.with_timezone(&tz).date_naive(),
        }
    }
}

/// Inclusive-start / exclusive-end date bounds sent as
/// `validfrom[after]` and `validfrom[strictly_before]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub after: NaiveDate,
    pub before: NaiveDate,
}

impl DateWindow {
    pub fn after_param(&self) -> String {
        self.after.format("%Y-%m-%d").to_string()
    }

    pub fn before_param(&self) -> String {
        self.before.format("%Y-%m-%d").to_string()
    }
}

/// Compute the query window for `now`
pub fn compute_window(now: DateTime<Utc>, window_days: u8, mode: TimezoneMode) -> DateWindow {
    let today = mode.date_of(now);
    DateWindow {
        after: today - TimeDelta::days(1),
        before: today + TimeDelta::days(i64::from(window_days)),
    }
}

//! Calendar-day derivation and host clock abstraction.
//!
//! # Responsibility
//! - Derive the device-local `DayKey` every daily rule is keyed on.
//! - Provide the wall clock as a seam so schedulers can be driven in tests.
//!
//! # Invariants
//! - Day keys are always derived in device-local time.
//! - The text form is `YYYY-MM-DD`, so lexical order equals calendar order.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Mutex;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Calendar-day identifier used to bucket actions and detect the day boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Derives the local calendar day of `at`.
    pub fn from_local(at: &DateTime<Local>) -> Self {
        Self(at.date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Signed number of calendar days from `self` to `later`.
    ///
    /// `0` for the same day, `1` for consecutive days, negative when `later`
    /// is actually earlier.
    pub fn days_until(&self, later: DayKey) -> i64 {
        later.0.signed_duration_since(self.0).num_days()
    }
}

impl Display for DayKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = chrono::ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(value, DAY_KEY_FORMAT).map(Self)
    }
}

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Host wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually driven clock for schedulers under test and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<Local>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, DayKey, ManualClock};
    use chrono::{Local, NaiveDate, TimeZone};

    fn day(y: i32, m: u32, d: u32) -> DayKey {
        DayKey::from_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn day_key_round_trips_through_text() {
        let key = day(2026, 3, 9);
        assert_eq!(key.to_string(), "2026-03-09");
        assert_eq!("2026-03-09".parse::<DayKey>().unwrap(), key);
    }

    #[test]
    fn days_until_counts_calendar_days_across_month_end() {
        assert_eq!(day(2026, 1, 31).days_until(day(2026, 2, 1)), 1);
        assert_eq!(day(2026, 2, 1).days_until(day(2026, 2, 1)), 0);
        assert_eq!(day(2026, 2, 10).days_until(day(2026, 2, 1)), -9);
    }

    #[test]
    fn from_local_uses_local_calendar_date() {
        let at = Local.with_ymd_and_hms(2026, 5, 4, 23, 59, 0).unwrap();
        assert_eq!(DayKey::from_local(&at), day(2026, 5, 4));
        let next = Local.with_ymd_and_hms(2026, 5, 5, 0, 0, 0).unwrap();
        assert_eq!(DayKey::from_local(&at).days_until(DayKey::from_local(&next)), 1);
    }

    #[test]
    fn manual_clock_returns_last_set_time() {
        let first = Local.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap();
        let second = Local.with_ymd_and_hms(2026, 5, 5, 8, 0, 0).unwrap();
        let clock = ManualClock::new(first);
        assert_eq!(clock.now(), first);
        clock.set(second);
        assert_eq!(clock.now(), second);
    }
}

//! Daily boundary reset.
//!
//! # Responsibility
//! - Release every focus slot when the calendar day changes.
//! - Archive completed one-off entries from earlier days.
//!
//! # Invariants
//! - Runs at most once per `DayKey`; the guard day is persisted.
//! - The sweep and the guard update share the caller's transaction, so a
//!   failed sweep leaves the guard day untouched and the next tick retries.
//! - Recurring tasks are never archived; they stay `Completed` so the next
//!   day's completion can extend the streak.

use crate::clock::DayKey;
use crate::model::entry::{EntryId, EntryStatus, LifecycleAction};
use crate::repo::entry_repo::{EntryRepository, RepoError};
use crate::repo::state_repo::{AppStateRepository, LAST_RESET_DAY_KEY};
use crate::service::error::EngineResult;
use chrono::{DateTime, Local};
use log::info;

/// What one sweep changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSummary {
    pub day: DayKey,
    pub previous_day: Option<DayKey>,
    pub demoted: Vec<EntryId>,
    pub archived: Vec<EntryId>,
}

/// Result of `maybe_run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The sweep already ran for this day.
    AlreadyRan(DayKey),
    Ran(ResetSummary),
}

/// Idempotent day-boundary sweep.
pub struct DailyResetService<E: EntryRepository, S: AppStateRepository> {
    entries: E,
    state: S,
}

impl<E: EntryRepository, S: AppStateRepository> DailyResetService<E, S> {
    pub fn new(entries: E, state: S) -> Self {
        Self { entries, state }
    }

    /// Day of the last successful sweep, if any.
    pub fn last_run_day(&self) -> EngineResult<Option<DayKey>> {
        match self.state.get_value(LAST_RESET_DAY_KEY)? {
            Some(text) => {
                let day = text.parse::<DayKey>().map_err(|_| {
                    RepoError::InvalidData(format!(
                        "invalid day `{text}` in app_state.{LAST_RESET_DAY_KEY}"
                    ))
                })?;
                Ok(Some(day))
            }
            None => Ok(None),
        }
    }

    /// Sweeps once per calendar day; later calls on the same day are no-ops.
    pub fn maybe_run(&self, now: DateTime<Local>) -> EngineResult<ResetOutcome> {
        let today = DayKey::from_local(&now);
        let previous_day = self.last_run_day()?;
        if previous_day == Some(today) {
            return Ok(ResetOutcome::AlreadyRan(today));
        }

        let at = now.timestamp_millis();
        let mut demoted = Vec::new();
        for mut entry in self.entries.list_focused()? {
            entry.is_focus = false;
            entry.record(LifecycleAction::MidnightReset, at);
            self.entries.update_entry(&entry)?;
            demoted.push(entry.id);
        }

        let mut archived = Vec::new();
        for mut entry in self.entries.list_by_status(EntryStatus::Completed)? {
            if entry.day_key == today || entry.is_recurring() {
                continue;
            }
            entry.status = EntryStatus::Archived;
            entry.record(LifecycleAction::Archived, at);
            self.entries.update_entry(&entry)?;
            archived.push(entry.id);
        }

        self.state
            .set_value(LAST_RESET_DAY_KEY, &today.to_string())?;

        info!(
            "event=daily_reset module=reset status=ok day={} previous_day={} demoted={} archived={}",
            today,
            previous_day.map_or_else(|| "none".to_string(), |day| day.to_string()),
            demoted.len(),
            archived.len()
        );
        Ok(ResetOutcome::Ran(ResetSummary {
            day: today,
            previous_day,
            demoted,
            archived,
        }))
    }
}

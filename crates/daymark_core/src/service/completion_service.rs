//! Task completion, undo and progress logging.
//!
//! # Responsibility
//! - Run the streak state machine when a recurring task is completed.
//! - Track quantity progress and complete tasks that reach their target.
//!
//! # Invariants
//! - Streak math is one-directional: undo never rewinds streak fields.
//! - `completed_at` keeps the first completion time until an undo clears it.
//! - Archived, deleted and mood entries cannot be completed.
//! - A recurring task whose recovery count is not below the configured
//!   cycles is rejected instead of advanced.

use crate::clock::DayKey;
use crate::config::StreakRules;
use crate::model::entry::{Entry, EntryId, EntryStatus, EntryValidationError, LifecycleAction};
use crate::repo::entry_repo::EntryRepository;
use crate::service::entry_service::load_live;
use crate::service::error::{EngineError, EngineResult};
use crate::service::streak::{self, StreakDisplay};
use chrono::{DateTime, Local};
use log::info;

/// Completion and progress facade.
pub struct CompletionService<R: EntryRepository> {
    repo: R,
    rules: StreakRules,
}

impl<R: EntryRepository> CompletionService<R> {
    pub fn new(repo: R, rules: StreakRules) -> Self {
        Self { repo, rules }
    }

    /// Completes a task on `now`'s calendar day.
    ///
    /// Completing an already-completed task again is allowed; for recurring
    /// tasks on the same day it leaves the streak untouched.
    pub fn complete_task(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        let mut entry = load_live(&self.repo, id)?;
        self.apply_completion(&mut entry, &now)?;
        self.repo.update_entry(&entry)?;
        Ok(entry)
    }

    /// Reverts a completion to `Active`. Streak fields stay as they are.
    pub fn undo_completion(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        let mut entry = load_live(&self.repo, id)?;
        if entry.status != EntryStatus::Completed {
            return Err(EngineError::invalid(id, "only completed tasks can be undone"));
        }

        entry.status = EntryStatus::Active;
        entry.completed_at = None;
        entry.record(LifecycleAction::Undone, now.timestamp_millis());
        self.repo.update_entry(&entry)?;
        info!("event=task_undo module=streak status=ok entry_id={id}");
        Ok(entry)
    }

    /// Adds `amount` to a task's progress, capped at its quantity.
    ///
    /// Reaching the quantity completes the task in the same write.
    pub fn record_progress(
        &self,
        id: EntryId,
        amount: u32,
        now: DateTime<Local>,
    ) -> EngineResult<Entry> {
        let mut entry = load_live(&self.repo, id)?;
        if !entry.is_task() || entry.status != EntryStatus::Active {
            return Err(EngineError::invalid(
                id,
                "progress can only be logged on active tasks",
            ));
        }
        let Some(quantity) = entry.quantity else {
            return Err(EngineError::invalid(id, "task has no target quantity"));
        };

        let progress = entry.progress.unwrap_or(0).saturating_add(amount).min(quantity);
        entry.progress = Some(progress);
        entry.record(LifecycleAction::Progress, now.timestamp_millis());
        if progress == quantity {
            self.apply_completion(&mut entry, &now)?;
        }

        self.repo.update_entry(&entry)?;
        info!(
            "event=task_progress module=streak status=ok entry_id={} progress={} quantity={}",
            id, progress, quantity
        );
        Ok(entry)
    }

    /// Read-only streak preview for `id` as seen at `now`.
    pub fn streak_display(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<StreakDisplay> {
        let entry = load_live(&self.repo, id)?;
        Ok(streak::display(
            &entry.streak,
            DayKey::from_local(&now),
            &self.rules,
        ))
    }

    fn apply_completion(&self, entry: &mut Entry, now: &DateTime<Local>) -> EngineResult<()> {
        if !entry.is_task() {
            return Err(EngineError::invalid(entry.id, "only tasks can be completed"));
        }
        if !matches!(entry.status, EntryStatus::Active | EntryStatus::Completed) {
            return Err(EngineError::invalid(
                entry.id,
                "archived tasks cannot be completed",
            ));
        }

        if entry.is_recurring() && entry.streak.recovery_count >= self.rules.recovery_cycles {
            return Err(EntryValidationError::RecoveryCountOutOfRange {
                count: entry.streak.recovery_count,
                cycles: self.rules.recovery_cycles,
            }
            .into());
        }

        let at = now.timestamp_millis();
        let before = entry.streak.current;
        if entry.is_recurring() {
            entry.streak =
                streak::apply_completion(entry.streak, DayKey::from_local(now), &self.rules);
        }
        entry.status = EntryStatus::Completed;
        entry.completed_at.get_or_insert(at);
        entry.record(LifecycleAction::Completed, at);

        info!(
            "event=task_complete module=streak status=ok entry_id={} streak_before={} streak_after={} recovery_count={}",
            entry.id, before, entry.streak.current, entry.streak.recovery_count
        );
        Ok(())
    }
}

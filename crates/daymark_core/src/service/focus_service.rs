//! Focus admission controller.
//!
//! # Invariants
//! - At most `capacity` entries hold `is_focus = true`.
//! - Promotion is rejected only for capacity or an invalid entry state,
//!   never for priority; there is no queue.
//! - Rejected calls write nothing.

use crate::model::entry::{Entry, EntryId, EntryStatus, LifecycleAction};
use crate::repo::entry_repo::EntryRepository;
use crate::service::entry_service::load_live;
use crate::service::error::{EngineError, EngineResult};
use chrono::{DateTime, Local};
use log::{info, warn};

/// Bounded focus working set.
pub struct FocusService<R: EntryRepository> {
    repo: R,
    capacity: u32,
}

impl<R: EntryRepository> FocusService<R> {
    pub fn new(repo: R, capacity: u32) -> Self {
        Self { repo, capacity }
    }

    /// Moves an active task into a free focus slot.
    ///
    /// # Errors
    /// - `NotFound` for missing or deleted entries.
    /// - `InvalidTransition` for moods, non-active tasks, or tasks already
    ///   in focus.
    /// - `FocusFull` when every slot is taken.
    pub fn promote(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        let mut entry = load_live(&self.repo, id)?;
        if !entry.is_task() {
            return Err(EngineError::invalid(id, "only tasks can be focused"));
        }
        if entry.status != EntryStatus::Active {
            return Err(EngineError::invalid(id, "only active tasks can be focused"));
        }
        if entry.is_focus {
            return Err(EngineError::invalid(id, "task is already focused"));
        }

        let in_use = self.repo.count_focused()?;
        if in_use >= self.capacity {
            warn!(
                "event=focus_promote module=focus status=rejected error_code=focus_full entry_id={} in_use={}",
                id, in_use
            );
            return Err(EngineError::FocusFull {
                capacity: self.capacity,
            });
        }

        entry.is_focus = true;
        entry.record(LifecycleAction::FocusEnter, now.timestamp_millis());
        self.repo.update_entry(&entry)?;
        info!(
            "event=focus_promote module=focus status=ok entry_id={} in_use={}",
            id,
            in_use + 1
        );
        Ok(entry)
    }

    /// Releases a focused entry's slot. No capacity check applies.
    pub fn demote(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        let mut entry = load_live(&self.repo, id)?;
        if !entry.is_focus {
            return Err(EngineError::invalid(id, "entry is not focused"));
        }

        entry.is_focus = false;
        entry.record(LifecycleAction::FocusExit, now.timestamp_millis());
        self.repo.update_entry(&entry)?;
        info!("event=focus_demote module=focus status=ok entry_id={id}");
        Ok(entry)
    }

    /// Number of free focus slots.
    pub fn available_slots(&self) -> EngineResult<u32> {
        Ok(self.capacity.saturating_sub(self.repo.count_focused()?))
    }
}

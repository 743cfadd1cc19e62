//! Entry use-case service.
//!
//! # Responsibility
//! - Create tasks and mood notes from UI input.
//! - Provide day/focus listings and soft/hard deletion.
//!
//! # Invariants
//! - Input is validated before anything is written.
//! - Soft-deleted entries behave as missing for every operation.

use crate::clock::DayKey;
use crate::model::entry::{
    normalize_frequency, Entry, EntryId, EntryStatus, Frequency, LifecycleAction, Priority,
};
use crate::repo::entry_repo::EntryRepository;
use crate::service::error::{EngineError, EngineResult};
use chrono::{DateTime, Local};
use log::info;

/// Request model for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub content: String,
    pub priority: Priority,
    /// Target amount; progress starts at `0` when set.
    pub quantity: Option<u32>,
    pub unit: Option<String>,
    pub frequency: Frequency,
}

impl NewTask {
    /// One-off task with normal priority and no target quantity.
    pub fn once(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            priority: Priority::Normal,
            quantity: None,
            unit: None,
            frequency: Frequency::Once,
        }
    }

    /// Daily recurring task with normal priority.
    pub fn daily(content: impl Into<String>) -> Self {
        Self {
            frequency: Frequency::Daily,
            ..Self::once(content)
        }
    }
}

/// Loads an entry, treating soft-deleted rows as missing.
pub(crate) fn load_live<R: EntryRepository>(repo: &R, id: EntryId) -> EngineResult<Entry> {
    match repo.get_entry(id)? {
        Some(entry) if entry.status != EntryStatus::Deleted => Ok(entry),
        _ => Err(EngineError::NotFound(id)),
    }
}

/// Entry creation, lookup and deletion facade.
pub struct EntryService<R: EntryRepository> {
    repo: R,
}

impl<R: EntryRepository> EntryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an active, unfocused task logged at `now`.
    pub fn create_task(&self, request: NewTask, now: DateTime<Local>) -> EngineResult<Entry> {
        let mut entry = Entry::new_task(request.content, &now)?;
        entry.priority = Some(request.priority);
        entry.quantity = request.quantity;
        entry.progress = request.quantity.map(|_| 0);
        entry.unit = request
            .unit
            .map(|unit| unit.trim().to_string())
            .filter(|unit| !unit.is_empty());
        entry.frequency = Some(normalize_frequency(request.frequency));
        entry.validate()?;

        self.repo.create_entry(&entry)?;
        info!(
            "event=entry_create module=entry status=ok kind=task entry_id={} recurring={}",
            entry.id,
            entry.is_recurring()
        );
        Ok(entry)
    }

    /// Creates a mood note with `score` in `[-2, 2]`.
    pub fn create_mood(
        &self,
        content: impl Into<String>,
        score: i8,
        now: DateTime<Local>,
    ) -> EngineResult<Entry> {
        let entry = Entry::new_mood(content, score, &now)?;
        self.repo.create_entry(&entry)?;
        info!(
            "event=entry_create module=entry status=ok kind=mood entry_id={}",
            entry.id
        );
        Ok(entry)
    }

    pub fn get_entry(&self, id: EntryId) -> EngineResult<Entry> {
        load_live(&self.repo, id)
    }

    /// Non-deleted entries created on `day`.
    pub fn list_day(&self, day: DayKey) -> EngineResult<Vec<Entry>> {
        let mut entries = self.repo.list_by_day(day)?;
        entries.retain(|entry| entry.status != EntryStatus::Deleted);
        Ok(entries)
    }

    pub fn list_focused(&self) -> EngineResult<Vec<Entry>> {
        Ok(self.repo.list_focused()?)
    }

    pub fn list_by_status(&self, status: EntryStatus) -> EngineResult<Vec<Entry>> {
        Ok(self.repo.list_by_status(status)?)
    }

    /// Marks an entry deleted, releasing its focus slot first.
    pub fn soft_delete(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        let mut entry = load_live(&self.repo, id)?;
        let at = now.timestamp_millis();
        if entry.is_focus {
            entry.is_focus = false;
            entry.record(LifecycleAction::FocusExit, at);
        }
        entry.status = EntryStatus::Deleted;
        entry.record(LifecycleAction::Deleted, at);
        self.repo.update_entry(&entry)?;
        info!(
            "event=entry_delete module=entry status=ok mode=soft entry_id={}",
            entry.id
        );
        Ok(entry)
    }

    /// Removes an entry and its lifecycle log permanently.
    pub fn hard_delete(&self, id: EntryId) -> EngineResult<()> {
        self.repo.delete_entry(id)?;
        info!("event=entry_delete module=entry status=ok mode=hard entry_id={id}");
        Ok(())
    }
}

//! Process-wide journal facade.
//!
//! # Responsibility
//! - Own the SQLite connection and the engine configuration.
//! - Run every engine operation as one immediate transaction.
//! - Drive the daily reset from a background thread.
//!
//! # Invariants
//! - Only one operation touches the connection at a time (mutex).
//! - An operation that returns `Err` has rolled back every write it made.

use crate::clock::{Clock, DayKey};
use crate::config::EngineConfig;
use crate::db::{open_db, open_db_in_memory};
use crate::model::entry::{Entry, EntryId, EntryStatus};
use crate::model::score::{LedgerRecord, ScoreCategory, UserScoreState};
use crate::repo::entry_repo::SqliteEntryRepository;
use crate::repo::score_repo::SqliteScoreRepository;
use crate::repo::state_repo::SqliteAppStateRepository;
use crate::service::completion_service::CompletionService;
use crate::service::entry_service::{EntryService, NewTask};
use crate::service::error::{EngineError, EngineResult};
use crate::service::focus_service::FocusService;
use crate::service::reset_service::{DailyResetService, ResetOutcome};
use crate::service::scoring_service::{AwardOutcome, ScoringService};
use crate::service::streak::StreakDisplay;
use chrono::{DateTime, Local};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

/// A completion together with the points it earned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTask {
    pub entry: Entry,
    /// `None` when the call repeated a completion already made that day.
    pub award: Option<AwardOutcome>,
}

/// Shared entry point for every engine operation.
pub struct Journal {
    conn: Mutex<Connection>,
    config: EngineConfig,
}

impl Journal {
    /// Opens (or creates) the journal database at `path`.
    pub fn open(path: impl AsRef<Path>, config: EngineConfig) -> EngineResult<Self> {
        Ok(Self::from_connection(open_db(path)?, config))
    }

    pub fn open_in_memory(config: EngineConfig) -> EngineResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?, config))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, config: EngineConfig) -> Self {
        Self {
            conn: Mutex::new(conn),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn create_task(&self, request: NewTask, now: DateTime<Local>) -> EngineResult<Entry> {
        self.write("entry_create", |conn| {
            EntryService::new(SqliteEntryRepository::try_new(conn)?).create_task(request, now)
        })
    }

    pub fn create_mood(
        &self,
        content: impl Into<String>,
        score: i8,
        now: DateTime<Local>,
    ) -> EngineResult<Entry> {
        let content = content.into();
        self.write("entry_create", |conn| {
            EntryService::new(SqliteEntryRepository::try_new(conn)?)
                .create_mood(content, score, now)
        })
    }

    /// Creates a mood note and grants `note_new` points in one transaction.
    pub fn log_mood(
        &self,
        content: impl Into<String>,
        score: i8,
        now: DateTime<Local>,
    ) -> EngineResult<(Entry, AwardOutcome)> {
        let content = content.into();
        self.write("mood_log", |conn| {
            let entry = EntryService::new(SqliteEntryRepository::try_new(conn)?)
                .create_mood(content, score, now)?;
            let award = self.scoring(conn)?.award(ScoreCategory::NoteNew, now)?;
            Ok((entry, award))
        })
    }

    pub fn get_entry(&self, id: EntryId) -> EngineResult<Entry> {
        self.read(|conn| EntryService::new(SqliteEntryRepository::try_new(conn)?).get_entry(id))
    }

    pub fn list_day(&self, day: DayKey) -> EngineResult<Vec<Entry>> {
        self.read(|conn| EntryService::new(SqliteEntryRepository::try_new(conn)?).list_day(day))
    }

    pub fn list_focused(&self) -> EngineResult<Vec<Entry>> {
        self.read(|conn| EntryService::new(SqliteEntryRepository::try_new(conn)?).list_focused())
    }

    pub fn list_by_status(&self, status: EntryStatus) -> EngineResult<Vec<Entry>> {
        self.read(|conn| {
            EntryService::new(SqliteEntryRepository::try_new(conn)?).list_by_status(status)
        })
    }

    pub fn soft_delete(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        self.write("entry_delete", |conn| {
            EntryService::new(SqliteEntryRepository::try_new(conn)?).soft_delete(id, now)
        })
    }

    pub fn hard_delete(&self, id: EntryId) -> EngineResult<()> {
        self.write("entry_delete", |conn| {
            EntryService::new(SqliteEntryRepository::try_new(conn)?).hard_delete(id)
        })
    }

    /// Moves a task into the focus set; `FocusFull` when no slot is free.
    pub fn promote(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        self.write("focus_promote", |conn| self.focus(conn)?.promote(id, now))
    }

    pub fn demote(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        self.write("focus_demote", |conn| self.focus(conn)?.demote(id, now))
    }

    pub fn available_focus_slots(&self) -> EngineResult<u32> {
        self.read(|conn| self.focus(conn)?.available_slots())
    }

    pub fn complete_task(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        self.write("task_complete", |conn| {
            self.completion(conn)?.complete_task(id, now)
        })
    }

    /// Completes a task and grants its points in one transaction.
    ///
    /// Grants `habit_log` for recurring tasks and `task_done` otherwise.
    /// Completing a task that is already completed for the day grants
    /// nothing. A failed award rolls the completion back.
    pub fn complete_and_award(
        &self,
        id: EntryId,
        now: DateTime<Local>,
    ) -> EngineResult<CompletedTask> {
        self.write("task_complete", |conn| {
            let before =
                EntryService::new(SqliteEntryRepository::try_new(conn)?).get_entry(id)?;
            let entry = self.completion(conn)?.complete_task(id, now)?;
            let repeated = before.status == EntryStatus::Completed
                && before.streak.last_date == entry.streak.last_date;
            let award = if repeated {
                None
            } else {
                let category = if entry.is_recurring() {
                    ScoreCategory::HabitLog
                } else {
                    ScoreCategory::TaskDone
                };
                Some(self.scoring(conn)?.award(category, now)?)
            };
            Ok(CompletedTask { entry, award })
        })
    }

    pub fn undo_completion(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<Entry> {
        self.write("task_undo", |conn| {
            self.completion(conn)?.undo_completion(id, now)
        })
    }

    pub fn record_progress(
        &self,
        id: EntryId,
        amount: u32,
        now: DateTime<Local>,
    ) -> EngineResult<Entry> {
        self.write("task_progress", |conn| {
            self.completion(conn)?.record_progress(id, amount, now)
        })
    }

    pub fn streak_display(&self, id: EntryId, now: DateTime<Local>) -> EngineResult<StreakDisplay> {
        self.read(|conn| self.completion(conn)?.streak_display(id, now))
    }

    /// Grants points for one action; the daily count is read in the same
    /// transaction as the ledger insert.
    pub fn award(&self, category: ScoreCategory, now: DateTime<Local>) -> EngineResult<AwardOutcome> {
        self.write("score_award", |conn| self.scoring(conn)?.award(category, now))
    }

    pub fn score_state(&self) -> EngineResult<UserScoreState> {
        self.read(|conn| self.scoring(conn)?.score_state())
    }

    pub fn awards_for_day(&self, day: DayKey) -> EngineResult<Vec<LedgerRecord>> {
        self.read(|conn| self.scoring(conn)?.awards_for_day(day))
    }

    /// Runs the daily sweep unless it already ran for `now`'s day.
    pub fn maybe_run_reset(&self, now: DateTime<Local>) -> EngineResult<ResetOutcome> {
        self.write("daily_reset", |conn| self.reset(conn)?.maybe_run(now))
    }

    pub fn last_reset_day(&self) -> EngineResult<Option<DayKey>> {
        self.read(|conn| self.reset(conn)?.last_run_day())
    }

    fn focus<'c>(&self, conn: &'c Connection) -> EngineResult<FocusService<SqliteEntryRepository<'c>>> {
        Ok(FocusService::new(
            SqliteEntryRepository::try_new(conn)?,
            self.config.focus.capacity,
        ))
    }

    fn completion<'c>(
        &self,
        conn: &'c Connection,
    ) -> EngineResult<CompletionService<SqliteEntryRepository<'c>>> {
        Ok(CompletionService::new(
            SqliteEntryRepository::try_new(conn)?,
            self.config.streak,
        ))
    }

    fn scoring<'c>(
        &self,
        conn: &'c Connection,
    ) -> EngineResult<ScoringService<SqliteScoreRepository<'c>>> {
        Ok(ScoringService::new(
            SqliteScoreRepository::try_new(conn)?,
            self.config.scoring,
        ))
    }

    fn reset<'c>(
        &self,
        conn: &'c Connection,
    ) -> EngineResult<DailyResetService<SqliteEntryRepository<'c>, SqliteAppStateRepository<'c>>>
    {
        Ok(DailyResetService::new(
            SqliteEntryRepository::try_new(conn)?,
            SqliteAppStateRepository::try_new(conn)?,
        ))
    }

    fn lock(&self) -> EngineResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            error!("event=journal_lock module=journal status=error error_code=lock_poisoned");
            EngineError::LockPoisoned
        })
    }

    fn read<T>(&self, op: impl FnOnce(&Connection) -> EngineResult<T>) -> EngineResult<T> {
        let conn = self.lock()?;
        op(&conn)
    }

    fn write<T>(
        &self,
        event: &'static str,
        op: impl FnOnce(&Connection) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        match op(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                // Dropping `tx` rolls back.
                warn!(
                    "event={} module=journal status=rolled_back error_code={}",
                    event,
                    err.code()
                );
                Err(err)
            }
        }
    }
}

/// Background thread that calls [`Journal::maybe_run_reset`] on launch and
/// then every `interval`.
pub struct ResetScheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ResetScheduler {
    pub fn spawn(journal: Arc<Journal>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || {
            info!(
                "event=reset_scheduler module=reset status=start interval_ms={}",
                interval.as_millis()
            );
            loop {
                run_tick(&journal, clock.as_ref());
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("event=reset_scheduler module=reset status=stopped");
        });
        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Signals the thread and waits for the current tick to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("event=reset_scheduler module=reset status=error error_code=thread_panicked");
            }
        }
    }
}

impl Drop for ResetScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_tick(journal: &Journal, clock: &dyn Clock) {
    match journal.maybe_run_reset(clock.now()) {
        Ok(ResetOutcome::AlreadyRan(_)) => {}
        Ok(ResetOutcome::Ran(summary)) => info!(
            "event=reset_tick module=reset status=ok day={} demoted={} archived={}",
            summary.day,
            summary.demoted.len(),
            summary.archived.len()
        ),
        // Next tick retries; the guard day was not advanced.
        Err(err) => error!(
            "event=reset_tick module=reset status=error error_code={} error={}",
            err.code(),
            err
        ),
    }
}

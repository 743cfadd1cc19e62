//! Entry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and range queries (by day, status, focus) over `entries`.
//! - Persist lifecycle logs into the append-only `entry_events` table.
//!
//! # Invariants
//! - Write paths call `Entry::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `kind`, `created_at` and `day_key` are never rewritten by updates.
//! - Updates may only append lifecycle events, never drop or rewrite them.

use crate::clock::DayKey;
use crate::db::{commit_scope, write_scope, DbError};
use crate::model::entry::{
    Entry, EntryId, EntryKind, EntryStatus, EntryValidationError, Frequency, LifecycleAction,
    LifecycleEvent, Priority, StreakState,
};
use crate::repo::schema::ensure_table_ready;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ENTRY_SELECT_SQL: &str = "SELECT
    uuid,
    kind,
    content,
    created_at,
    day_key,
    status,
    is_focus,
    priority,
    mood_score,
    quantity,
    progress,
    unit,
    frequency,
    frequency_days,
    completed_at,
    streak_current,
    streak_last_date,
    streak_recovery_count,
    streak_frozen_value
FROM entries";

const ENTRY_COLUMNS: &[&str] = &[
    "uuid",
    "kind",
    "content",
    "created_at",
    "day_key",
    "status",
    "is_focus",
    "priority",
    "mood_score",
    "quantity",
    "progress",
    "unit",
    "frequency",
    "frequency_days",
    "completed_at",
    "streak_current",
    "streak_last_date",
    "streak_recovery_count",
    "streak_frozen_value",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntryValidationError),
    Db(DbError),
    NotFound(EntryId),
    /// Update attempted to change a field fixed at creation.
    ImmutableField {
        id: EntryId,
        field: &'static str,
    },
    /// Update attempted a status change the lifecycle does not allow.
    StatusTransition {
        id: EntryId,
        from: EntryStatus,
        to: EntryStatus,
    },
    /// Update carried fewer lifecycle events than already persisted.
    LifecycleTruncated {
        id: EntryId,
        persisted: usize,
        provided: usize,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::ImmutableField { id, field } => {
                write!(f, "entry {id} field `{field}` cannot change after creation")
            }
            Self::StatusTransition { id, from, to } => write!(
                f,
                "entry {id} cannot move from `{}` to `{}`",
                from.as_str(),
                to.as_str()
            ),
            Self::LifecycleTruncated {
                id,
                persisted,
                provided,
            } => write!(
                f,
                "entry {id} lifecycle log has {persisted} persisted events, update carried {provided}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store contract consumed by the focus, streak and reset services.
pub trait EntryRepository {
    fn create_entry(&self, entry: &Entry) -> RepoResult<EntryId>;
    /// Full replacement of mutable fields plus append of new lifecycle events.
    fn update_entry(&self, entry: &Entry) -> RepoResult<()>;
    /// Loads one entry regardless of status.
    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>>;
    /// Entries whose creation day is `day`, oldest first.
    fn list_by_day(&self, day: DayKey) -> RepoResult<Vec<Entry>>;
    fn list_by_status(&self, status: EntryStatus) -> RepoResult<Vec<Entry>>;
    fn list_focused(&self) -> RepoResult<Vec<Entry>>;
    fn count_focused(&self) -> RepoResult<u32>;
    /// Removes the row and its lifecycle log.
    fn delete_entry(&self, id: EntryId) -> RepoResult<()>;
}

/// SQLite-backed entry repository.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "entries", ENTRY_COLUMNS)?;
        ensure_table_ready(conn, "entry_events", &["entry_uuid", "seq", "action", "at"])?;
        Ok(Self { conn })
    }

    fn list_where<P: Params>(&self, clause: &str, params: P) -> RepoResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL} WHERE {clause} ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params)?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(self.hydrate(row)?);
        }
        Ok(entries)
    }

    fn hydrate(&self, row: &Row<'_>) -> RepoResult<Entry> {
        let mut entry = parse_entry_row(row)?;
        entry.lifecycle_log = load_events(self.conn, entry.id)?;
        entry.validate()?;
        Ok(entry)
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn create_entry(&self, entry: &Entry) -> RepoResult<EntryId> {
        entry.validate()?;
        let (frequency, frequency_days) = frequency_to_db(entry.frequency.as_ref());

        let scope = write_scope(self.conn)?;
        self.conn.execute(
            "INSERT INTO entries (
                uuid,
                kind,
                content,
                created_at,
                day_key,
                status,
                is_focus,
                priority,
                mood_score,
                quantity,
                progress,
                unit,
                frequency,
                frequency_days,
                completed_at,
                streak_current,
                streak_last_date,
                streak_recovery_count,
                streak_frozen_value
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19);",
            params![
                entry.id.to_string(),
                entry.kind.as_str(),
                entry.content.as_str(),
                entry.created_at,
                entry.day_key.to_string(),
                entry.status.as_str(),
                bool_to_int(entry.is_focus),
                entry.priority.map(priority_to_db),
                entry.mood_score,
                entry.quantity,
                entry.progress,
                entry.unit.as_deref(),
                frequency,
                frequency_days,
                entry.completed_at,
                entry.streak.current,
                entry.streak.last_date.map(|day| day.to_string()),
                entry.streak.recovery_count,
                entry.streak.frozen_value,
            ],
        )?;
        insert_events(self.conn, entry.id, 0, &entry.lifecycle_log)?;
        commit_scope(scope)?;

        Ok(entry.id)
    }

    fn update_entry(&self, entry: &Entry) -> RepoResult<()> {
        entry.validate()?;

        let scope = write_scope(self.conn)?;
        let fixed: Option<(String, i64, String, String)> = self
            .conn
            .query_row(
                "SELECT kind, created_at, day_key, status FROM entries WHERE uuid = ?1;",
                [entry.id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((kind, created_at, day_key, status)) = fixed else {
            return Err(RepoError::NotFound(entry.id));
        };
        if kind != entry.kind.as_str() {
            return Err(immutable(entry.id, "kind"));
        }
        if created_at != entry.created_at {
            return Err(immutable(entry.id, "created_at"));
        }
        if day_key != entry.day_key.to_string() {
            return Err(immutable(entry.id, "day_key"));
        }
        let from = parse_status(&status).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid status `{status}` in entries.status"))
        })?;
        if from != entry.status && !from.can_transition_to(entry.status) {
            return Err(RepoError::StatusTransition {
                id: entry.id,
                from,
                to: entry.status,
            });
        }

        let persisted = count_events(self.conn, entry.id)?;
        if entry.lifecycle_log.len() < persisted {
            return Err(RepoError::LifecycleTruncated {
                id: entry.id,
                persisted,
                provided: entry.lifecycle_log.len(),
            });
        }

        let (frequency, frequency_days) = frequency_to_db(entry.frequency.as_ref());
        self.conn.execute(
            "UPDATE entries
             SET
                content = ?1,
                status = ?2,
                is_focus = ?3,
                priority = ?4,
                mood_score = ?5,
                quantity = ?6,
                progress = ?7,
                unit = ?8,
                frequency = ?9,
                frequency_days = ?10,
                completed_at = ?11,
                streak_current = ?12,
                streak_last_date = ?13,
                streak_recovery_count = ?14,
                streak_frozen_value = ?15,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?16;",
            params![
                entry.content.as_str(),
                entry.status.as_str(),
                bool_to_int(entry.is_focus),
                entry.priority.map(priority_to_db),
                entry.mood_score,
                entry.quantity,
                entry.progress,
                entry.unit.as_deref(),
                frequency,
                frequency_days,
                entry.completed_at,
                entry.streak.current,
                entry.streak.last_date.map(|day| day.to_string()),
                entry.streak.recovery_count,
                entry.streak.frozen_value,
                entry.id.to_string(),
            ],
        )?;
        insert_events(
            self.conn,
            entry.id,
            persisted,
            &entry.lifecycle_log[persisted..],
        )?;
        commit_scope(scope)?;

        Ok(())
    }

    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(self.hydrate(row)?)),
            None => Ok(None),
        }
    }

    fn list_by_day(&self, day: DayKey) -> RepoResult<Vec<Entry>> {
        self.list_where("day_key = ?1", params![day.to_string()])
    }

    fn list_by_status(&self, status: EntryStatus) -> RepoResult<Vec<Entry>> {
        self.list_where("status = ?1", params![status.as_str()])
    }

    fn list_focused(&self) -> RepoResult<Vec<Entry>> {
        self.list_where("is_focus = 1", params![])
    }

    fn count_focused(&self) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE is_focus = 1;",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_entry(&self, id: EntryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM entries WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn immutable(id: EntryId, field: &'static str) -> RepoError {
    RepoError::ImmutableField { id, field }
}

fn count_events(conn: &Connection, id: EntryId) -> RepoResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entry_events WHERE entry_uuid = ?1;",
        [id.to_string()],
        |row| row.get(0),
    )?;
    usize::try_from(count)
        .map_err(|_| RepoError::InvalidData(format!("negative event count for entry {id}")))
}

fn insert_events(
    conn: &Connection,
    id: EntryId,
    first_seq: usize,
    events: &[LifecycleEvent],
) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO entry_events (entry_uuid, seq, action, at) VALUES (?1, ?2, ?3, ?4);",
    )?;
    for (offset, event) in events.iter().enumerate() {
        let seq = i64::try_from(first_seq + offset)
            .map_err(|_| RepoError::InvalidData("lifecycle sequence overflow".to_string()))?;
        stmt.execute(params![
            id.to_string(),
            seq,
            event.action.as_str(),
            event.at
        ])?;
    }
    Ok(())
}

fn load_events(conn: &Connection, id: EntryId) -> RepoResult<Vec<LifecycleEvent>> {
    let mut stmt = conn.prepare(
        "SELECT action, at FROM entry_events WHERE entry_uuid = ?1 ORDER BY seq ASC;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        let action_text: String = row.get("action")?;
        let action = LifecycleAction::parse(&action_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid lifecycle action `{action_text}` in entry_events.action"
            ))
        })?;
        events.push(LifecycleEvent {
            action,
            at: row.get("at")?,
        });
    }
    Ok(events)
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<Entry> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in entries.uuid"))
    })?;

    let kind_text: String = row.get("kind")?;
    let kind = parse_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid entry kind `{kind_text}` in entries.kind"))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid entry status `{status_text}` in entries.status"
        ))
    })?;

    let priority = match row.get::<_, Option<String>>("priority")? {
        Some(value) => Some(parse_priority(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid priority `{value}` in entries.priority"))
        })?),
        None => None,
    };

    let frequency = parse_frequency(
        row.get::<_, Option<String>>("frequency")?,
        row.get::<_, Option<String>>("frequency_days")?,
    )?;

    let is_focus = match row.get::<_, i64>("is_focus")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_focus value `{other}` in entries.is_focus"
            )));
        }
    };

    Ok(Entry {
        id,
        kind,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        day_key: parse_day_key(row.get("day_key")?, "entries.day_key")?,
        status,
        is_focus,
        priority,
        mood_score: row.get("mood_score")?,
        quantity: row.get("quantity")?,
        progress: row.get("progress")?,
        unit: row.get("unit")?,
        frequency,
        completed_at: row.get("completed_at")?,
        streak: StreakState {
            current: row.get("streak_current")?,
            last_date: match row.get::<_, Option<String>>("streak_last_date")? {
                Some(text) => Some(parse_day_key(text, "entries.streak_last_date")?),
                None => None,
            },
            recovery_count: row.get("streak_recovery_count")?,
            frozen_value: row.get("streak_frozen_value")?,
        },
        lifecycle_log: Vec::new(),
    })
}

pub(crate) fn parse_day_key(text: String, column: &str) -> RepoResult<DayKey> {
    text.parse::<DayKey>()
        .map_err(|_| RepoError::InvalidData(format!("invalid day key `{text}` in {column}")))
}

fn parse_kind(value: &str) -> Option<EntryKind> {
    match value {
        "task" => Some(EntryKind::Task),
        "mood" => Some(EntryKind::Mood),
        _ => None,
    }
}

fn parse_status(value: &str) -> Option<EntryStatus> {
    match value {
        "active" => Some(EntryStatus::Active),
        "completed" => Some(EntryStatus::Completed),
        "archived" => Some(EntryStatus::Archived),
        "deleted" => Some(EntryStatus::Deleted),
        _ => None,
    }
}

fn priority_to_db(priority: Priority) -> &'static str {
    match priority {
        Priority::Normal => "normal",
        Priority::Important => "important",
        Priority::Urgent => "urgent",
        Priority::Critical => "critical",
    }
}

fn parse_priority(value: &str) -> Option<Priority> {
    match value {
        "normal" => Some(Priority::Normal),
        "important" => Some(Priority::Important),
        "urgent" => Some(Priority::Urgent),
        "critical" => Some(Priority::Critical),
        _ => None,
    }
}

fn frequency_to_db(frequency: Option<&Frequency>) -> (Option<&'static str>, Option<String>) {
    match frequency {
        None => (None, None),
        Some(Frequency::Once) => (Some("once"), None),
        Some(Frequency::Daily) => (Some("daily"), None),
        Some(Frequency::Weekly(days)) => (Some("weekly"), Some(join_days(days))),
        Some(Frequency::Monthly(dates)) => (Some("monthly"), Some(join_days(dates))),
    }
}

fn join_days(days: &[u8]) -> String {
    days.iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_frequency(kind: Option<String>, days: Option<String>) -> RepoResult<Option<Frequency>> {
    let Some(kind) = kind else {
        return Ok(None);
    };
    let frequency = match kind.as_str() {
        "once" => Frequency::Once,
        "daily" => Frequency::Daily,
        "weekly" => Frequency::Weekly(parse_days(days.as_deref())?),
        "monthly" => Frequency::Monthly(parse_days(days.as_deref())?),
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid frequency `{other}` in entries.frequency"
            )));
        }
    };
    Ok(Some(frequency))
}

fn parse_days(text: Option<&str>) -> RepoResult<Vec<u8>> {
    let text = text.unwrap_or_default();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(|part| {
            part.trim().parse::<u8>().map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid day `{part}` in entries.frequency_days"
                ))
            })
        })
        .collect()
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

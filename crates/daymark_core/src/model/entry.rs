//! Entry domain model.
//!
//! # Responsibility
//! - Define the canonical record for task and mood log items.
//! - Own record-level validation and the append-only lifecycle log.
//!
//! # Invariants
//! - `id`, `created_at`, `day_key` and `kind` never change after creation.
//! - `streak.current` stays within `0..=STREAK_CEILING`.
//! - `streak.recovery_count` stays below `RECOVERY_CYCLES_MAX`.
//! - `lifecycle_log` starts with `created` and only grows.
//! - Only active or completed tasks may hold a focus slot; completed tasks
//!   keep their slot until the daily reset or an explicit demotion.

use crate::clock::DayKey;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every logged entry.
pub type EntryId = Uuid;

/// Hard upper bound for any persisted streak value.
pub const STREAK_CEILING: u8 = 99;

/// Upper bound for the configurable number of recovery cycles.
pub const RECOVERY_CYCLES_MAX: u8 = 10;

/// Inclusive bounds of a mood score.
pub const MOOD_SCORE_MIN: i8 = -2;
pub const MOOD_SCORE_MAX: i8 = 2;

/// Entry category, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Actionable item; may be focused, completed and carry a streak.
    Task,
    /// Mood note with a score in `[-2, 2]`.
    Mood,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Mood => "mood",
        }
    }
}

/// Entry lifecycle state.
///
/// Transitions only move forward, except the explicit undo
/// `Completed -> Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Active,
    Completed,
    Archived,
    Deleted,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    /// Returns whether `self -> next` is an allowed status change.
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Completed)
                | (Self::Active, Self::Deleted)
                | (Self::Completed, Self::Active)
                | (Self::Completed, Self::Archived)
                | (Self::Completed, Self::Deleted)
                | (Self::Archived, Self::Deleted)
        )
    }
}

/// Task priority label. Informational only; focus admission ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    Important,
    Urgent,
    Critical,
}

/// Task repetition policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "every", content = "on")]
pub enum Frequency {
    #[default]
    Once,
    Daily,
    /// ISO weekdays, `1` = Monday .. `7` = Sunday.
    Weekly(Vec<u8>),
    /// Days of month, `1..=31`.
    Monthly(Vec<u8>),
}

impl Frequency {
    /// Recurring tasks are the only ones that track a streak.
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Self::Once)
    }
}

/// Completion streak snapshot of one recurring task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u8,
    pub last_date: Option<DayKey>,
    /// Long lapses counted in the current recovery cycle.
    pub recovery_count: u8,
    /// Streak value captured at the first long lapse of a recovery cycle.
    pub frozen_value: u8,
}

/// Action recorded in an entry lifecycle log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Created,
    FocusEnter,
    FocusExit,
    Completed,
    Undone,
    Archived,
    MidnightReset,
    Progress,
    Deleted,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::FocusEnter => "focus_enter",
            Self::FocusExit => "focus_exit",
            Self::Completed => "completed",
            Self::Undone => "undone",
            Self::Archived => "archived",
            Self::MidnightReset => "midnight_reset",
            Self::Progress => "progress",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "focus_enter" => Some(Self::FocusEnter),
            "focus_exit" => Some(Self::FocusExit),
            "completed" => Some(Self::Completed),
            "undone" => Some(Self::Undone),
            "archived" => Some(Self::Archived),
            "midnight_reset" => Some(Self::MidnightReset),
            "progress" => Some(Self::Progress),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// One lifecycle log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub action: LifecycleAction,
    /// Unix epoch milliseconds.
    pub at: i64,
}

/// Validation failures for entry records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    EmptyContent,
    /// A required field for this kind is unset.
    MissingField {
        kind: EntryKind,
        field: &'static str,
    },
    /// A field that is meaningless for this kind is set.
    FieldNotAllowed {
        kind: EntryKind,
        field: &'static str,
    },
    MoodScoreOutOfRange(i8),
    ProgressExceedsQuantity {
        progress: u32,
        quantity: u32,
    },
    InvalidWeekday(u8),
    InvalidMonthDate(u8),
    EmptyRecurrence,
    StreakOutOfRange(u8),
    /// Recovery count at or above the number of cycles that resets it.
    RecoveryCountOutOfRange {
        count: u8,
        cycles: u8,
    },
    /// Focus is held by a mood or by an archived/deleted task.
    FocusNotAllowed(EntryStatus),
    /// `completed_at` disagrees with `status`.
    CompletionMismatch(EntryStatus),
    InvalidLifecycleLog(&'static str),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "entry content must not be blank"),
            Self::MissingField { kind, field } => {
                write!(f, "{} entry requires `{field}`", kind.as_str())
            }
            Self::FieldNotAllowed { kind, field } => {
                write!(f, "{} entry must not set `{field}`", kind.as_str())
            }
            Self::MoodScoreOutOfRange(score) => write!(
                f,
                "mood score {score} is outside [{MOOD_SCORE_MIN}, {MOOD_SCORE_MAX}]"
            ),
            Self::ProgressExceedsQuantity { progress, quantity } => {
                write!(f, "progress {progress} exceeds quantity {quantity}")
            }
            Self::InvalidWeekday(day) => write!(f, "weekday {day} is outside 1..=7"),
            Self::InvalidMonthDate(date) => write!(f, "month date {date} is outside 1..=31"),
            Self::EmptyRecurrence => write!(f, "weekly/monthly frequency needs at least one day"),
            Self::StreakOutOfRange(value) => {
                write!(f, "streak value {value} exceeds {STREAK_CEILING}")
            }
            Self::RecoveryCountOutOfRange { count, cycles } => {
                write!(f, "recovery count {count} must stay below {cycles} cycles")
            }
            Self::FocusNotAllowed(status) => {
                write!(f, "entry with status `{}` cannot be focused", status.as_str())
            }
            Self::CompletionMismatch(status) => write!(
                f,
                "completed_at does not match status `{}`",
                status.as_str()
            ),
            Self::InvalidLifecycleLog(details) => write!(f, "invalid lifecycle log: {details}"),
        }
    }
}

impl Error for EntryValidationError {}

/// Canonical record for one logged item.
///
/// Task-only and mood-only fields stay optional so both kinds share one
/// storage shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub day_key: DayKey,
    pub status: EntryStatus,
    pub is_focus: bool,
    /// Task only.
    pub priority: Option<Priority>,
    /// Mood only.
    pub mood_score: Option<i8>,
    /// Task only. Target amount.
    pub quantity: Option<u32>,
    /// Task only. `0..=quantity`.
    pub progress: Option<u32>,
    /// Task only.
    pub unit: Option<String>,
    /// Task only.
    pub frequency: Option<Frequency>,
    /// Unix epoch milliseconds of the first completion.
    pub completed_at: Option<i64>,
    pub streak: StreakState,
    pub lifecycle_log: Vec<LifecycleEvent>,
}

impl Entry {
    /// Creates an active, unfocused task logged at `at`.
    ///
    /// Defaults to `Priority::Normal` and `Frequency::Once`.
    pub fn new_task(
        content: impl Into<String>,
        at: &DateTime<Local>,
    ) -> Result<Self, EntryValidationError> {
        let mut entry = Self::blank(EntryKind::Task, content.into(), at);
        entry.priority = Some(Priority::Normal);
        entry.frequency = Some(Frequency::Once);
        entry.validate()?;
        Ok(entry)
    }

    /// Creates an active mood note logged at `at`.
    pub fn new_mood(
        content: impl Into<String>,
        score: i8,
        at: &DateTime<Local>,
    ) -> Result<Self, EntryValidationError> {
        let mut entry = Self::blank(EntryKind::Mood, content.into(), at);
        entry.mood_score = Some(score);
        entry.validate()?;
        Ok(entry)
    }

    fn blank(kind: EntryKind, content: String, at: &DateTime<Local>) -> Self {
        let created_at = at.timestamp_millis();
        Self {
            id: Uuid::new_v4(),
            kind,
            content,
            created_at,
            day_key: DayKey::from_local(at),
            status: EntryStatus::Active,
            is_focus: false,
            priority: None,
            mood_score: None,
            quantity: None,
            progress: None,
            unit: None,
            frequency: None,
            completed_at: None,
            streak: StreakState::default(),
            lifecycle_log: vec![LifecycleEvent {
                action: LifecycleAction::Created,
                at: created_at,
            }],
        }
    }

    pub fn is_task(&self) -> bool {
        self.kind == EntryKind::Task
    }

    /// Whether this entry is a task with a repeating frequency.
    pub fn is_recurring(&self) -> bool {
        self.is_task()
            && self
                .frequency
                .as_ref()
                .is_some_and(Frequency::is_recurring)
    }

    /// Appends one lifecycle event.
    pub fn record(&mut self, action: LifecycleAction, at: i64) {
        self.lifecycle_log.push(LifecycleEvent { action, at });
    }

    /// Validates record-level invariants.
    ///
    /// Called before every persistence write and after every read.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.content.trim().is_empty() {
            return Err(EntryValidationError::EmptyContent);
        }

        match self.kind {
            EntryKind::Task => self.validate_task()?,
            EntryKind::Mood => self.validate_mood()?,
        }

        if self.streak.current > STREAK_CEILING {
            return Err(EntryValidationError::StreakOutOfRange(self.streak.current));
        }
        if self.streak.frozen_value > STREAK_CEILING {
            return Err(EntryValidationError::StreakOutOfRange(
                self.streak.frozen_value,
            ));
        }
        if self.streak.recovery_count >= RECOVERY_CYCLES_MAX {
            return Err(EntryValidationError::RecoveryCountOutOfRange {
                count: self.streak.recovery_count,
                cycles: RECOVERY_CYCLES_MAX,
            });
        }

        let focus_status = matches!(self.status, EntryStatus::Active | EntryStatus::Completed);
        if self.is_focus && (!self.is_task() || !focus_status) {
            return Err(EntryValidationError::FocusNotAllowed(self.status));
        }

        match (self.status, self.completed_at) {
            (EntryStatus::Active, Some(_)) | (EntryStatus::Completed, None) => {
                return Err(EntryValidationError::CompletionMismatch(self.status));
            }
            _ => {}
        }

        match self.lifecycle_log.first() {
            Some(first) if first.action == LifecycleAction::Created => Ok(()),
            Some(_) => Err(EntryValidationError::InvalidLifecycleLog(
                "first event must be `created`",
            )),
            None => Err(EntryValidationError::InvalidLifecycleLog("log is empty")),
        }
    }

    fn validate_task(&self) -> Result<(), EntryValidationError> {
        let kind = EntryKind::Task;
        if self.mood_score.is_some() {
            return Err(EntryValidationError::FieldNotAllowed {
                kind,
                field: "mood_score",
            });
        }
        if self.priority.is_none() {
            return Err(EntryValidationError::MissingField {
                kind,
                field: "priority",
            });
        }

        match (self.quantity, self.progress) {
            (None, Some(_)) => {
                return Err(EntryValidationError::MissingField {
                    kind,
                    field: "quantity",
                });
            }
            (Some(quantity), Some(progress)) if progress > quantity => {
                return Err(EntryValidationError::ProgressExceedsQuantity { progress, quantity });
            }
            _ => {}
        }

        match &self.frequency {
            None => Err(EntryValidationError::MissingField {
                kind,
                field: "frequency",
            }),
            Some(frequency) => validate_frequency(frequency),
        }
    }

    fn validate_mood(&self) -> Result<(), EntryValidationError> {
        let kind = EntryKind::Mood;
        let task_fields = [
            ("priority", self.priority.is_some()),
            ("quantity", self.quantity.is_some()),
            ("progress", self.progress.is_some()),
            ("unit", self.unit.is_some()),
            ("frequency", self.frequency.is_some()),
        ];
        if let Some((field, _)) = task_fields.iter().find(|(_, set)| *set) {
            return Err(EntryValidationError::FieldNotAllowed { kind, field });
        }
        if self.streak != StreakState::default() {
            return Err(EntryValidationError::FieldNotAllowed {
                kind,
                field: "streak",
            });
        }

        match self.mood_score {
            None => Err(EntryValidationError::MissingField {
                kind,
                field: "mood_score",
            }),
            Some(score) if !(MOOD_SCORE_MIN..=MOOD_SCORE_MAX).contains(&score) => {
                Err(EntryValidationError::MoodScoreOutOfRange(score))
            }
            Some(_) => Ok(()),
        }
    }
}

fn validate_frequency(frequency: &Frequency) -> Result<(), EntryValidationError> {
    match frequency {
        Frequency::Once | Frequency::Daily => Ok(()),
        Frequency::Weekly(days) => {
            if days.is_empty() {
                return Err(EntryValidationError::EmptyRecurrence);
            }
            match days.iter().find(|day| !(1..=7).contains(*day)) {
                Some(day) => Err(EntryValidationError::InvalidWeekday(*day)),
                None => Ok(()),
            }
        }
        Frequency::Monthly(dates) => {
            if dates.is_empty() {
                return Err(EntryValidationError::EmptyRecurrence);
            }
            match dates.iter().find(|date| !(1..=31).contains(*date)) {
                Some(date) => Err(EntryValidationError::InvalidMonthDate(*date)),
                None => Ok(()),
            }
        }
    }
}

/// Sorts and de-duplicates weekly/monthly day lists.
pub fn normalize_frequency(frequency: Frequency) -> Frequency {
    match frequency {
        Frequency::Weekly(mut days) => {
            days.sort_unstable();
            days.dedup();
            Frequency::Weekly(days)
        }
        Frequency::Monthly(mut dates) => {
            dates.sort_unstable();
            dates.dedup();
            Frequency::Monthly(dates)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_frequency, Entry, EntryStatus, EntryValidationError, Frequency, LifecycleAction,
        RECOVERY_CYCLES_MAX,
    };
    use chrono::{Local, TimeZone};

    fn noon() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_task_starts_active_unfocused_with_created_event() {
        let task = Entry::new_task("water plants", &noon()).unwrap();
        assert_eq!(task.status, EntryStatus::Active);
        assert!(!task.is_focus);
        assert_eq!(task.frequency, Some(Frequency::Once));
        assert_eq!(task.day_key.to_string(), "2026-04-01");
        assert_eq!(task.lifecycle_log.len(), 1);
        assert_eq!(task.lifecycle_log[0].action, LifecycleAction::Created);
    }

    #[test]
    fn blank_content_is_rejected() {
        let err = Entry::new_task("   ", &noon()).unwrap_err();
        assert_eq!(err, EntryValidationError::EmptyContent);
    }

    #[test]
    fn mood_score_must_be_within_bounds() {
        assert!(Entry::new_mood("fine", 2, &noon()).is_ok());
        let err = Entry::new_mood("awful", -3, &noon()).unwrap_err();
        assert_eq!(err, EntryValidationError::MoodScoreOutOfRange(-3));
    }

    #[test]
    fn mood_cannot_hold_focus_or_task_fields() {
        let mut mood = Entry::new_mood("calm", 1, &noon()).unwrap();
        mood.is_focus = true;
        assert!(matches!(
            mood.validate(),
            Err(EntryValidationError::FocusNotAllowed(_))
        ));

        let mut mood = Entry::new_mood("calm", 1, &noon()).unwrap();
        mood.unit = Some("cups".to_string());
        assert!(matches!(
            mood.validate(),
            Err(EntryValidationError::FieldNotAllowed { field: "unit", .. })
        ));
    }

    #[test]
    fn progress_cannot_exceed_quantity() {
        let mut task = Entry::new_task("push-ups", &noon()).unwrap();
        task.quantity = Some(20);
        task.progress = Some(21);
        assert_eq!(
            task.validate(),
            Err(EntryValidationError::ProgressExceedsQuantity {
                progress: 21,
                quantity: 20
            })
        );
    }

    #[test]
    fn weekly_days_are_checked_and_normalized() {
        let mut task = Entry::new_task("run", &noon()).unwrap();
        task.frequency = Some(Frequency::Weekly(vec![8]));
        assert_eq!(task.validate(), Err(EntryValidationError::InvalidWeekday(8)));

        let normalized = normalize_frequency(Frequency::Weekly(vec![5, 1, 5, 3]));
        assert_eq!(normalized, Frequency::Weekly(vec![1, 3, 5]));
        assert!(normalized.is_recurring());
    }

    #[test]
    fn completed_status_requires_completion_time() {
        let mut task = Entry::new_task("read", &noon()).unwrap();
        task.status = EntryStatus::Completed;
        assert_eq!(
            task.validate(),
            Err(EntryValidationError::CompletionMismatch(EntryStatus::Completed))
        );
    }

    #[test]
    fn recovery_count_is_bounded() {
        let mut task = Entry::new_task("read", &noon()).unwrap();
        task.streak.recovery_count = RECOVERY_CYCLES_MAX - 1;
        assert!(task.validate().is_ok());
        task.streak.recovery_count = 200;
        assert_eq!(
            task.validate(),
            Err(EntryValidationError::RecoveryCountOutOfRange {
                count: 200,
                cycles: RECOVERY_CYCLES_MAX
            })
        );
    }

    #[test]
    fn status_transitions_only_allow_undo_as_regression() {
        assert!(EntryStatus::Completed.can_transition_to(EntryStatus::Active));
        assert!(!EntryStatus::Archived.can_transition_to(EntryStatus::Active));
        assert!(!EntryStatus::Deleted.can_transition_to(EntryStatus::Active));
        assert!(!EntryStatus::Archived.can_transition_to(EntryStatus::Completed));
    }

    #[test]
    fn entry_serializes_with_snake_case_tags() {
        let mut task = Entry::new_task("stretch", &noon()).unwrap();
        task.frequency = Some(Frequency::Weekly(vec![1, 4]));
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["kind"], "task");
        assert_eq!(value["status"], "active");
        assert_eq!(value["frequency"]["every"], "weekly");
        assert_eq!(value["day_key"], "2026-04-01");
    }
}

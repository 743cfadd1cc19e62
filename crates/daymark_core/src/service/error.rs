//! Engine-level error taxonomy returned to UI callers.

use crate::db::DbError;
use crate::model::entry::{EntryId, EntryValidationError};
use crate::repo::entry_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Typed failure of an engine operation. None of these are fatal; every
/// failed operation leaves persisted state untouched.
#[derive(Debug)]
pub enum EngineError {
    /// Focus set is at capacity. Callers may retry after a demotion.
    FocusFull { capacity: u32 },
    /// Entry is missing or soft-deleted.
    NotFound(EntryId),
    /// Operation is not valid for the entry's kind or state.
    InvalidTransition {
        id: EntryId,
        reason: &'static str,
    },
    /// Input failed record validation before any write.
    Validation(EntryValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Another thread panicked while holding the journal lock.
    LockPoisoned,
}

impl EngineError {
    pub(crate) fn invalid(id: EntryId, reason: &'static str) -> Self {
        Self::InvalidTransition { id, reason }
    }

    /// Stable machine-readable code for logs and UI mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FocusFull { .. } => "focus_full",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Validation(_) => "validation",
            Self::Repo(_) => "repo",
            Self::LockPoisoned => "lock_poisoned",
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FocusFull { capacity } => {
                write!(f, "focus set is full ({capacity} slots in use)")
            }
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::InvalidTransition { id, reason } => {
                write!(f, "invalid transition for entry {id}: {reason}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "journal lock poisoned"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<EntryValidationError> for EngineError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

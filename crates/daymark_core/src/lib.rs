//! Core engine for Daymark, a personal daily log.
//! This crate owns every business invariant: focus capacity, streaks,
//! scoring and the daily reset.

pub mod clock;
pub mod config;
pub mod db;
pub mod journal;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, DayKey, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig, StreakRules};
pub use journal::{CompletedTask, Journal, ResetScheduler};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entry::{
    Entry, EntryId, EntryKind, EntryStatus, EntryValidationError, Frequency, LifecycleAction,
    Priority, StreakState,
};
pub use model::score::{ScoreCategory, UserScoreState};
pub use repo::entry_repo::{RepoError, RepoResult};
pub use service::entry_service::NewTask;
pub use service::error::{EngineError, EngineResult};
pub use service::reset_service::{ResetOutcome, ResetSummary};
pub use service::scoring_service::AwardOutcome;
pub use service::streak::{StreakDisplay, StreakStrength};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

//! Diminishing-returns scoring.
//!
//! # Invariants
//! - Per-day counts come from the ledger read in the same transaction as
//!   the insert, so concurrent awards cannot double-count a tier.
//! - Categories are independent of each other and of streak state.

use crate::clock::DayKey;
use crate::config::ScoringConfig;
use crate::model::score::{LedgerRecord, ScoreCategory, UserScoreState};
use crate::repo::score_repo::ScoreRepository;
use crate::service::error::EngineResult;
use chrono::{DateTime, Local};
use log::info;

/// Result of one award call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardOutcome {
    pub category: ScoreCategory,
    pub points: u32,
    pub state: UserScoreState,
    /// Whether this award moved the user to a higher level.
    pub leveled_up: bool,
}

/// Point award and level facade.
pub struct ScoringService<R: ScoreRepository> {
    repo: R,
    config: ScoringConfig,
}

impl<R: ScoreRepository> ScoringService<R> {
    pub fn new(repo: R, config: ScoringConfig) -> Self {
        Self { repo, config }
    }

    /// Grants points for one `category` action at `now`.
    pub fn award(&self, category: ScoreCategory, now: DateTime<Local>) -> EngineResult<AwardOutcome> {
        let day = DayKey::from_local(&now);
        let count = self.repo.count_awards(category, day)?;
        let points = self
            .config
            .rule(category)
            .points_for(count, self.config.low_limit);

        self.repo.append_award(&LedgerRecord {
            category,
            points,
            awarded_at: now.timestamp_millis(),
            day_key: day,
        })?;

        let before = self.score_state()?;
        let state = before.with_award(points, self.config.level_step);
        self.repo.store_total_points(state.total_points)?;

        info!(
            "event=score_award module=scoring status=ok category={} daily_count={} points={} total={} level={}",
            category.as_str(),
            count + 1,
            points,
            state.total_points,
            state.level
        );
        Ok(AwardOutcome {
            category,
            points,
            state,
            leveled_up: state.level > before.level,
        })
    }

    pub fn score_state(&self) -> EngineResult<UserScoreState> {
        Ok(UserScoreState::from_total(
            self.repo.total_points()?,
            self.config.level_step,
        ))
    }

    /// Ledger records for `day` in award order.
    pub fn awards_for_day(&self, day: DayKey) -> EngineResult<Vec<LedgerRecord>> {
        Ok(self.repo.list_awards(day)?)
    }
}

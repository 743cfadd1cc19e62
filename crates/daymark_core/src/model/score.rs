//! Point ledger and user score model.
//!
//! # Invariants
//! - Ledger records are immutable once written.
//! - `total_points` never decreases; `level` is a pure function of it.

use crate::clock::DayKey;
use serde::{Deserialize, Serialize};

/// Action category that earns points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    IdentityFill,
    TaskDone,
    HabitLog,
    NoteNew,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 4] = [
        Self::IdentityFill,
        Self::TaskDone,
        Self::HabitLog,
        Self::NoteNew,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityFill => "identity_fill",
            Self::TaskDone => "task_done",
            Self::HabitLog => "habit_log",
            Self::NoteNew => "note_new",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "identity_fill" => Some(Self::IdentityFill),
            "task_done" => Some(Self::TaskDone),
            "habit_log" => Some(Self::HabitLog),
            "note_new" => Some(Self::NoteNew),
            _ => None,
        }
    }
}

/// Diminishing-returns table for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRule {
    pub high_points: u32,
    pub low_points: u32,
    /// Granted once the daily count reaches the low limit. May be `0`.
    pub min_points: u32,
    /// Number of awards per day paid at `high_points`.
    pub high_limit: u32,
}

impl ScoreRule {
    /// Points for the next award given `count` awards already granted today.
    pub fn points_for(&self, count: u32, low_limit: u32) -> u32 {
        if count < self.high_limit {
            self.high_points
        } else if count < low_limit {
            self.low_points
        } else {
            self.min_points
        }
    }
}

/// One immutable award record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub category: ScoreCategory,
    pub points: u32,
    /// Unix epoch milliseconds.
    pub awarded_at: i64,
    pub day_key: DayKey,
}

/// Singleton cumulative score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScoreState {
    pub total_points: u64,
    pub level: u32,
}

impl UserScoreState {
    pub fn from_total(total_points: u64, level_step: u64) -> Self {
        Self {
            total_points,
            level: level_for(total_points, level_step),
        }
    }

    /// Returns the state after adding `points`.
    pub fn with_award(&self, points: u32, level_step: u64) -> Self {
        Self::from_total(
            self.total_points.saturating_add(u64::from(points)),
            level_step,
        )
    }
}

/// `1 + floor(total / level_step)`.
pub fn level_for(total_points: u64, level_step: u64) -> u32 {
    let step = level_step.max(1);
    let level = 1 + total_points / step;
    u32::try_from(level).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{level_for, ScoreCategory, ScoreRule, UserScoreState};

    #[test]
    fn level_boundaries_follow_step() {
        assert_eq!(level_for(0, 200), 1);
        assert_eq!(level_for(199, 200), 1);
        assert_eq!(level_for(200, 200), 2);
        assert_eq!(level_for(1_000, 200), 6);
    }

    #[test]
    fn rule_switches_tiers_at_limits() {
        let rule = ScoreRule {
            high_points: 5,
            low_points: 2,
            min_points: 0,
            high_limit: 4,
        };
        let grants: Vec<u32> = (0..12).map(|count| rule.points_for(count, 10)).collect();
        assert_eq!(grants, vec![5, 5, 5, 5, 2, 2, 2, 2, 2, 2, 0, 0]);
    }

    #[test]
    fn award_accumulates_and_recomputes_level() {
        let state = UserScoreState::from_total(195, 200);
        assert_eq!(state.level, 1);
        let next = state.with_award(5, 200);
        assert_eq!(next.total_points, 200);
        assert_eq!(next.level, 2);
    }

    #[test]
    fn category_text_round_trips() {
        for category in ScoreCategory::ALL {
            assert_eq!(ScoreCategory::parse(category.as_str()), Some(category));
        }
    }
}

//! Streak state machine for recurring tasks.
//!
//! # Responsibility
//! - Compute the next `StreakState` from the gap since the last completion.
//! - Derive the read-only streak preview shown between completions.
//!
//! # Invariants
//! - Every function here is pure; nothing reads the clock or the store.
//! - `current` stays within `0..=rules.max_streak`.
//! - Preview never writes back to the stored state.

use crate::clock::DayKey;
use crate::config::StreakRules;
use crate::model::entry::StreakState;

/// Returns the state after one completion, given `gap_days` since the last
/// completion day (`None` when the task was never completed).
///
/// A zero or negative gap is a same-day re-completion and leaves the streak
/// unchanged.
pub fn advance(state: StreakState, gap_days: Option<i64>, rules: &StreakRules) -> StreakState {
    let max = rules.max_streak;
    match gap_days {
        None => StreakState {
            current: 1.min(max),
            ..state
        },
        Some(gap) if gap <= 0 => state,
        Some(1) => StreakState {
            current: state.current.saturating_add(1).min(max),
            ..state
        },
        Some(gap) if gap <= rules.grace_days => {
            let penalty = gap - 1;
            StreakState {
                current: clamp_streak(i64::from(state.current) - penalty + 1, max),
                ..state
            }
        }
        Some(gap) => recover(state, gap, rules),
    }
}

fn recover(state: StreakState, gap: i64, rules: &StreakRules) -> StreakState {
    let mut next = state;
    if next.recovery_count == 0 {
        next.frozen_value = next.current;
    }
    next.recovery_count = next.recovery_count.saturating_add(1);

    if next.recovery_count >= rules.recovery_cycles {
        next.current = clamp_streak(i64::from(next.frozen_value) - gap, rules.max_streak);
        next.recovery_count = 0;
        next.frozen_value = 0;
    } else {
        next.current = 1;
    }
    next
}

fn clamp_streak(value: i64, max: u8) -> u8 {
    // max >= 1 is enforced by config validation.
    let clamped = value.clamp(1, i64::from(max.max(1)));
    u8::try_from(clamped).unwrap_or(max)
}

/// Applies a completion on `today` and stamps the completion day.
///
/// The stored day never moves backwards when the host clock does.
pub fn apply_completion(state: StreakState, today: DayKey, rules: &StreakRules) -> StreakState {
    let gap = state.last_date.map(|last| last.days_until(today));
    let mut next = advance(state, gap, rules);
    next.last_date = Some(match state.last_date {
        Some(last) if last > today => last,
        _ => today,
    });
    next
}

/// Visual weight of a streak preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakStrength {
    Full,
    Faded,
    Hidden,
}

/// Read-only streak preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakDisplay {
    pub value: u8,
    pub strength: StreakStrength,
    /// Days missed since the last completion (`gap - 1`, never negative).
    pub missed_days: i64,
    /// `1.0` at full strength, shrinking linearly across the grace window.
    pub opacity: f32,
}

impl StreakDisplay {
    fn hidden(missed_days: i64) -> Self {
        Self {
            value: 0,
            strength: StreakStrength::Hidden,
            missed_days,
            opacity: 0.0,
        }
    }
}

/// Derives the preview of `state` as seen on `today`.
pub fn display(state: &StreakState, today: DayKey, rules: &StreakRules) -> StreakDisplay {
    let Some(last) = state.last_date else {
        return StreakDisplay::hidden(0);
    };
    let gap = last.days_until(today);
    let missed_days = (gap - 1).max(0);

    if gap <= 1 {
        return StreakDisplay {
            value: state.current,
            strength: StreakStrength::Full,
            missed_days,
            opacity: 1.0,
        };
    }
    if gap > rules.grace_days {
        return StreakDisplay::hidden(missed_days);
    }

    let faded = (i64::from(state.current) - missed_days).max(0);
    StreakDisplay {
        value: u8::try_from(faded).unwrap_or(0),
        strength: StreakStrength::Faded,
        missed_days,
        opacity: 1.0 - missed_days as f32 / rules.grace_days as f32,
    }
}

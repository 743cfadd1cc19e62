mod common;

use common::{add_daily, add_task, at, journal};
use daymark_core::config::ScoringConfig;
use daymark_core::db::open_db_in_memory;
use daymark_core::model::score::{ScoreRule, UserScoreState};
use daymark_core::{DayKey, EngineConfig, EngineError, EntryStatus, Journal, ScoreCategory};

#[test]
fn task_done_awards_diminish_after_high_limit() {
    let journal = journal();
    let now = at(2026, 3, 10, 9);

    let points: Vec<u32> = (0..6)
        .map(|_| journal.award(ScoreCategory::TaskDone, now).unwrap().points)
        .collect();
    assert_eq!(points, vec![5, 5, 5, 5, 2, 2]);
    assert_eq!(journal.score_state().unwrap().total_points, 24);
}

#[test]
fn awards_past_low_limit_pay_minimum() {
    let journal = journal();
    let now = at(2026, 3, 10, 9);

    let points: Vec<u32> = (0..12)
        .map(|_| journal.award(ScoreCategory::NoteNew, now).unwrap().points)
        .collect();
    // note_new: high 2 x3, low 1 until ten, then 0.
    assert_eq!(points, vec![2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 0, 0]);
}

#[test]
fn daily_counts_are_per_category_and_per_day() {
    let journal = journal();
    let day_one = at(2026, 3, 10, 9);
    let day_two = at(2026, 3, 11, 9);

    for _ in 0..4 {
        journal.award(ScoreCategory::TaskDone, day_one).unwrap();
    }
    assert_eq!(
        journal.award(ScoreCategory::HabitLog, day_one).unwrap().points,
        3
    );
    assert_eq!(
        journal.award(ScoreCategory::TaskDone, day_two).unwrap().points,
        5
    );

    let ledger = journal
        .awards_for_day(DayKey::from_local(&day_one))
        .unwrap();
    assert_eq!(ledger.len(), 5);
    assert!(ledger
        .iter()
        .all(|record| record.day_key == DayKey::from_local(&day_one)));
    assert_eq!(ledger[4].category, ScoreCategory::HabitLog);
}

#[test]
fn level_boundary_sits_at_two_hundred_points() {
    assert_eq!(UserScoreState::from_total(0, 200).level, 1);
    assert_eq!(UserScoreState::from_total(199, 200).level, 1);
    assert_eq!(UserScoreState::from_total(200, 200).level, 2);
    assert_eq!(UserScoreState::from_total(401, 200).level, 3);
}

#[test]
fn crossing_level_step_reports_level_up() {
    let mut config = EngineConfig::default();
    config.scoring = ScoringConfig {
        identity_fill: ScoreRule {
            high_points: 100,
            low_points: 100,
            min_points: 100,
            high_limit: 1,
        },
        ..ScoringConfig::default()
    };
    let journal = Journal::open_in_memory(config).unwrap();
    let now = at(2026, 3, 10, 9);

    let first = journal.award(ScoreCategory::IdentityFill, now).unwrap();
    assert_eq!(first.state.level, 1);
    assert!(!first.leveled_up);

    let second = journal.award(ScoreCategory::IdentityFill, now).unwrap();
    assert_eq!(second.state.total_points, 200);
    assert_eq!(second.state.level, 2);
    assert!(second.leveled_up);
    assert_eq!(journal.score_state().unwrap(), second.state);
}

#[test]
fn score_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.sqlite3");
    let now = at(2026, 3, 10, 9);

    {
        let journal = Journal::open(&path, EngineConfig::default()).unwrap();
        journal.award(ScoreCategory::IdentityFill, now).unwrap();
        journal.award(ScoreCategory::IdentityFill, now).unwrap();
        journal.award(ScoreCategory::IdentityFill, now).unwrap();
    }

    let journal = Journal::open(&path, EngineConfig::default()).unwrap();
    assert_eq!(journal.score_state().unwrap().total_points, 14);
}

#[test]
fn completion_awards_once_per_completion() {
    let journal = journal();
    let now = at(2026, 3, 10, 9);
    let id = add_task(&journal, "Pay rent", now);

    let first = journal.complete_and_award(id, now).unwrap();
    assert_eq!(first.entry.status, EntryStatus::Completed);
    let award = first.award.unwrap();
    assert_eq!(award.category, ScoreCategory::TaskDone);
    assert_eq!(award.points, 5);

    let again = journal.complete_and_award(id, at(2026, 3, 10, 18)).unwrap();
    assert_eq!(again.award, None);
    assert_eq!(journal.score_state().unwrap().total_points, 5);
}

#[test]
fn recurring_completion_awards_habit_log_each_day() {
    let journal = journal();
    let id = add_daily(&journal, "Stretch", at(2026, 3, 1, 7));

    let day_one = journal.complete_and_award(id, at(2026, 3, 1, 8)).unwrap();
    assert_eq!(day_one.award.map(|award| award.category), Some(ScoreCategory::HabitLog));
    journal.maybe_run_reset(at(2026, 3, 2, 0)).unwrap();

    let day_two = journal.complete_and_award(id, at(2026, 3, 2, 8)).unwrap();
    assert_eq!(day_two.entry.streak.current, 2);
    assert_eq!(day_two.award.map(|award| award.points), Some(3));
    assert_eq!(journal.score_state().unwrap().total_points, 6);
}

#[test]
fn failed_award_rolls_back_the_completion() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("DELETE FROM score_state;", []).unwrap();
    let journal = Journal::from_connection(conn, EngineConfig::default());
    let now = at(2026, 3, 10, 9);
    let id = add_task(&journal, "Call home", now);

    let err = journal.complete_and_award(id, now).unwrap_err();
    assert!(matches!(err, EngineError::Repo(_)));

    let entry = journal.get_entry(id).unwrap();
    assert_eq!(entry.status, EntryStatus::Active);
    assert_eq!(entry.completed_at, None);
    assert_eq!(entry.lifecycle_log.len(), 1);
    assert!(journal
        .awards_for_day(DayKey::from_local(&now))
        .unwrap()
        .is_empty());
}

#[test]
fn mood_note_and_its_points_are_logged_together() {
    let journal = journal();
    let now = at(2026, 3, 10, 21);

    let (entry, award) = journal.log_mood("calm evening", 1, now).unwrap();
    assert_eq!(entry.mood_score, Some(1));
    assert_eq!(award.category, ScoreCategory::NoteNew);
    assert_eq!(award.points, 2);
    assert_eq!(journal.list_day(DayKey::from_local(&now)).unwrap(), vec![entry]);
}

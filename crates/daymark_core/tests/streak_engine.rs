mod common;

use common::{add_daily, add_task, at, journal};
use daymark_core::db::open_db_in_memory;
use daymark_core::{
    EngineConfig, EngineError, EntryStatus, EntryValidationError, Journal, LifecycleAction,
    NewTask, StreakStrength,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn consecutive_days_grow_the_streak() {
    let journal = journal();
    let id = add_daily(&journal, "Meditate", at(2026, 3, 1, 7));

    for day in 1..=5 {
        let entry = journal.complete_task(id, at(2026, 3, day, 8)).unwrap();
        assert_eq!(entry.streak.current, day as u8);
    }
    let entry = journal.get_entry(id).unwrap();
    assert_eq!(entry.status, EntryStatus::Completed);
    assert_eq!(
        entry.streak.last_date.map(|day| day.to_string()).as_deref(),
        Some("2026-03-05")
    );
}

#[test]
fn same_day_recompletion_leaves_streak_unchanged() {
    let journal = journal();
    let id = add_daily(&journal, "Stretch", at(2026, 3, 1, 7));

    let first = journal.complete_task(id, at(2026, 3, 1, 8)).unwrap();
    let second = journal.complete_task(id, at(2026, 3, 1, 21)).unwrap();
    assert_eq!(first.streak, second.streak);
    assert_eq!(second.completed_at, first.completed_at);
}

#[test]
fn grace_gap_applies_penalty() {
    let journal = journal();
    let id = add_daily(&journal, "Run", at(2026, 3, 1, 7));
    for day in 1..=10 {
        journal.complete_task(id, at(2026, 3, day, 8)).unwrap();
    }

    // Last completion on the 10th; the 14th is a gap of 4 days.
    let entry = journal.complete_task(id, at(2026, 3, 14, 8)).unwrap();
    assert_eq!(entry.streak.current, 8);
}

#[test]
fn third_long_lapse_restores_frozen_streak_minus_gap() {
    let journal = journal();
    let id = add_daily(&journal, "Journal", at(2026, 1, 1, 7));
    for day in 1..=30 {
        journal.complete_task(id, at(2026, 1, day, 8)).unwrap();
    }
    assert_eq!(journal.get_entry(id).unwrap().streak.current, 30);

    // Lapse 1: Jan 30 -> Feb 9 (gap 10).
    let entry = journal.complete_task(id, at(2026, 2, 9, 8)).unwrap();
    assert_eq!(entry.streak.current, 1);
    assert_eq!(entry.streak.recovery_count, 1);
    assert_eq!(entry.streak.frozen_value, 30);

    // Lapse 2: Feb 9 -> Feb 19 (gap 10).
    let entry = journal.complete_task(id, at(2026, 2, 19, 8)).unwrap();
    assert_eq!(entry.streak.current, 1);
    assert_eq!(entry.streak.recovery_count, 2);
    assert_eq!(entry.streak.frozen_value, 30);

    // Lapse 3: Feb 19 -> Feb 26 (gap 7) restores 30 - 7.
    let entry = journal.complete_task(id, at(2026, 2, 26, 8)).unwrap();
    assert_eq!(entry.streak.current, 23);
    assert_eq!(entry.streak.recovery_count, 0);
    assert_eq!(entry.streak.frozen_value, 0);
}

#[test]
fn streak_is_capped_at_ninety_nine() {
    let journal = journal();
    let id = add_daily(&journal, "Water", at(2026, 1, 1, 7));
    let start = at(2026, 1, 1, 8);
    for offset in 0..105 {
        journal
            .complete_task(id, start + chrono::Duration::days(offset))
            .unwrap();
    }
    assert_eq!(journal.get_entry(id).unwrap().streak.current, 99);
}

#[test]
fn undo_does_not_rewind_streak() {
    let journal = journal();
    let id = add_daily(&journal, "Floss", at(2026, 3, 1, 7));
    journal.complete_task(id, at(2026, 3, 1, 8)).unwrap();
    let done = journal.complete_task(id, at(2026, 3, 2, 8)).unwrap();

    let undone = journal.undo_completion(id, at(2026, 3, 2, 9)).unwrap();
    assert_eq!(undone.status, EntryStatus::Active);
    assert_eq!(undone.completed_at, None);
    assert_eq!(undone.streak, done.streak);
    assert_eq!(
        undone.lifecycle_log.last().map(|event| event.action),
        Some(LifecycleAction::Undone)
    );

    let redone = journal.complete_task(id, at(2026, 3, 2, 10)).unwrap();
    assert_eq!(redone.streak.current, 2);
}

#[test]
fn one_off_tasks_do_not_track_streaks() {
    let journal = journal();
    let id = add_task(&journal, "Buy stamps", at(2026, 3, 1, 7));
    let entry = journal.complete_task(id, at(2026, 3, 1, 8)).unwrap();
    assert_eq!(entry.streak.current, 0);
    assert_eq!(entry.streak.last_date, None);
}

#[test]
fn undo_requires_a_completed_task() {
    let journal = journal();
    let now = at(2026, 3, 1, 8);
    let id = add_task(&journal, "Email", now);
    assert!(matches!(
        journal.undo_completion(id, now),
        Err(EngineError::InvalidTransition { .. })
    ));
}

#[test]
fn archived_and_mood_entries_cannot_be_completed() {
    let journal = journal();
    let day_one = at(2026, 3, 1, 8);
    let id = add_task(&journal, "Old chore", day_one);
    journal.complete_task(id, day_one).unwrap();
    journal.maybe_run_reset(at(2026, 3, 2, 0)).unwrap();
    assert_eq!(journal.get_entry(id).unwrap().status, EntryStatus::Archived);

    assert!(matches!(
        journal.complete_task(id, at(2026, 3, 2, 8)),
        Err(EngineError::InvalidTransition { .. })
    ));

    let mood = journal.create_mood("fine", 0, day_one).unwrap();
    assert!(matches!(
        journal.complete_task(mood.id, day_one),
        Err(EngineError::InvalidTransition { .. })
    ));
}

#[test]
fn streak_display_fades_then_hides_without_writing() {
    let journal = journal();
    let id = add_daily(&journal, "Read", at(2026, 3, 1, 7));
    for day in 1..=6 {
        journal.complete_task(id, at(2026, 3, day, 8)).unwrap();
    }
    let stored = journal.get_entry(id).unwrap();

    let next_day = journal.streak_display(id, at(2026, 3, 7, 8)).unwrap();
    assert_eq!(next_day.value, 6);
    assert_eq!(next_day.strength, StreakStrength::Full);

    let faded = journal.streak_display(id, at(2026, 3, 9, 8)).unwrap();
    assert_eq!(faded.value, 4);
    assert_eq!(faded.strength, StreakStrength::Faded);
    assert_eq!(faded.missed_days, 2);

    let hidden = journal.streak_display(id, at(2026, 3, 13, 8)).unwrap();
    assert_eq!(hidden.value, 0);
    assert_eq!(hidden.strength, StreakStrength::Hidden);

    assert_eq!(journal.get_entry(id).unwrap(), stored);
}

#[test]
fn progress_completes_task_at_quantity() {
    let journal = journal();
    let now = at(2026, 3, 1, 8);
    let task = journal
        .create_task(
            NewTask {
                quantity: Some(8),
                unit: Some("glasses".to_string()),
                ..NewTask::daily("Drink water")
            },
            now,
        )
        .unwrap();

    let partial = journal.record_progress(task.id, 5, now).unwrap();
    assert_eq!(partial.progress, Some(5));
    assert_eq!(partial.status, EntryStatus::Active);

    let full = journal.record_progress(task.id, 10, now).unwrap();
    assert_eq!(full.progress, Some(8));
    assert_eq!(full.status, EntryStatus::Completed);
    assert_eq!(full.streak.current, 1);
    let actions: Vec<_> = full.lifecycle_log.iter().map(|event| event.action).collect();
    assert_eq!(
        actions,
        vec![
            LifecycleAction::Created,
            LifecycleAction::Progress,
            LifecycleAction::Progress,
            LifecycleAction::Completed,
        ]
    );

    assert!(matches!(
        journal.record_progress(task.id, 1, now),
        Err(EngineError::InvalidTransition { .. })
    ));
}

#[test]
fn progress_requires_a_target_quantity() {
    let journal = journal();
    let now = at(2026, 3, 1, 8);
    let id = add_task(&journal, "No target", now);
    assert!(matches!(
        journal.record_progress(id, 1, now),
        Err(EngineError::InvalidTransition { .. })
    ));
    assert_eq!(journal.get_entry(id).unwrap().lifecycle_log.len(), 1);
}

fn insert_daily_with_recovery(conn: &Connection, recovery_count: u8) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO entries (uuid, kind, content, created_at, day_key, status, is_focus, priority,
                              frequency, streak_current, streak_last_date, streak_recovery_count,
                              streak_frozen_value)
         VALUES (?1, 'task', 'imported', 0, '2026-02-01', 'active', 0, 'normal',
                 'daily', 1, '2026-02-20', ?2, 30);",
        rusqlite::params![id.to_string(), recovery_count],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO entry_events (entry_uuid, seq, action, at) VALUES (?1, 0, 'created', 0);",
        [id.to_string()],
    )
    .unwrap();
    id
}

#[test]
fn recovery_count_at_configured_cycles_refuses_completion() {
    let conn = open_db_in_memory().unwrap();
    let id = insert_daily_with_recovery(&conn, 3);
    let journal = Journal::from_connection(conn, EngineConfig::default());

    let err = journal.complete_task(id, at(2026, 3, 5, 8)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(EntryValidationError::RecoveryCountOutOfRange {
            count: 3,
            cycles: 3
        })
    ));
    let entry = journal.get_entry(id).unwrap();
    assert_eq!(entry.status, EntryStatus::Active);
    assert_eq!(entry.streak.recovery_count, 3);
}

#[test]
fn implausible_recovery_count_fails_on_read() {
    let conn = open_db_in_memory().unwrap();
    let id = insert_daily_with_recovery(&conn, 42);
    let journal = Journal::from_connection(conn, EngineConfig::default());

    assert!(matches!(
        journal.get_entry(id),
        Err(EngineError::Validation(
            EntryValidationError::RecoveryCountOutOfRange { count: 42, .. }
        ))
    ));
}

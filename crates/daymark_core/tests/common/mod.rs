#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};
use daymark_core::{EngineConfig, Journal, NewTask};
use uuid::Uuid;

/// Local wall-clock instant; hours are kept away from DST gaps.
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap()
}

pub fn journal() -> Journal {
    Journal::open_in_memory(EngineConfig::default()).unwrap()
}

pub fn add_task(journal: &Journal, content: &str, now: DateTime<Local>) -> Uuid {
    journal.create_task(NewTask::once(content), now).unwrap().id
}

pub fn add_daily(journal: &Journal, content: &str, now: DateTime<Local>) -> Uuid {
    journal.create_task(NewTask::daily(content), now).unwrap().id
}

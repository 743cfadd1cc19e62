//! Key/value persistence for process-external engine state.

use crate::repo::entry_repo::RepoResult;
use crate::repo::schema::ensure_table_ready;
use rusqlite::{params, Connection, OptionalExtension};

/// Key holding the day of the last successful daily reset.
pub const LAST_RESET_DAY_KEY: &str = "last_reset_day";

/// Single-string settings that must survive process restarts.
pub trait AppStateRepository {
    fn get_value(&self, key: &str) -> RepoResult<Option<String>>;
    fn set_value(&self, key: &str, value: &str) -> RepoResult<()>;
}

/// SQLite-backed app-state repository.
pub struct SqliteAppStateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAppStateRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "app_state", &["key", "value", "updated_at"])?;
        Ok(Self { conn })
    }
}

impl AppStateRepository for SqliteAppStateRepository<'_> {
    fn get_value(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM app_state WHERE key = ?1;", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_value(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO app_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}

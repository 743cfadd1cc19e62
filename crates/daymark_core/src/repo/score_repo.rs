//! Point ledger and score-state persistence.
//!
//! # Invariants
//! - `point_ledger` rows are insert-only.
//! - `score_state` holds exactly one row and its total only grows.

use crate::clock::DayKey;
use crate::model::score::{LedgerRecord, ScoreCategory};
use crate::repo::entry_repo::{parse_day_key, RepoError, RepoResult};
use crate::repo::schema::ensure_table_ready;
use rusqlite::{params, Connection};

/// Ledger and cumulative-score contract used by the scoring service.
pub trait ScoreRepository {
    /// Awards already granted for `category` on `day`.
    fn count_awards(&self, category: ScoreCategory, day: DayKey) -> RepoResult<u32>;
    fn append_award(&self, record: &LedgerRecord) -> RepoResult<()>;
    fn list_awards(&self, day: DayKey) -> RepoResult<Vec<LedgerRecord>>;
    fn total_points(&self) -> RepoResult<u64>;
    /// Replaces the stored total; rejects decreases.
    fn store_total_points(&self, total: u64) -> RepoResult<()>;
}

/// SQLite-backed ledger repository.
pub struct SqliteScoreRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScoreRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "point_ledger",
            &["id", "category", "points", "awarded_at", "day_key"],
        )?;
        ensure_table_ready(conn, "score_state", &["id", "total_points"])?;
        Ok(Self { conn })
    }
}

impl ScoreRepository for SqliteScoreRepository<'_> {
    fn count_awards(&self, category: ScoreCategory, day: DayKey) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM point_ledger WHERE category = ?1 AND day_key = ?2;",
            params![category.as_str(), day.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn append_award(&self, record: &LedgerRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO point_ledger (category, points, awarded_at, day_key)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                record.category.as_str(),
                record.points,
                record.awarded_at,
                record.day_key.to_string(),
            ],
        )?;
        Ok(())
    }

    fn list_awards(&self, day: DayKey) -> RepoResult<Vec<LedgerRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, points, awarded_at, day_key
             FROM point_ledger
             WHERE day_key = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([day.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let category_text: String = row.get("category")?;
            let category = ScoreCategory::parse(&category_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid category `{category_text}` in point_ledger.category"
                ))
            })?;
            records.push(LedgerRecord {
                category,
                points: row.get("points")?,
                awarded_at: row.get("awarded_at")?,
                day_key: parse_day_key(row.get("day_key")?, "point_ledger.day_key")?,
            });
        }
        Ok(records)
    }

    fn total_points(&self) -> RepoResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT total_points FROM score_state WHERE id = 1;",
            [],
            |row| row.get(0),
        )?;
        u64::try_from(total).map_err(|_| {
            RepoError::InvalidData(format!("negative total `{total}` in score_state"))
        })
    }

    fn store_total_points(&self, total: u64) -> RepoResult<()> {
        let total = i64::try_from(total)
            .map_err(|_| RepoError::InvalidData(format!("total {total} exceeds storage range")))?;
        let changed = self.conn.execute(
            "UPDATE score_state SET total_points = ?1 WHERE id = 1 AND total_points <= ?1;",
            [total],
        )?;
        if changed == 0 {
            return Err(RepoError::InvalidData(format!(
                "refusing to lower total_points to {total}"
            )));
        }
        Ok(())
    }
}

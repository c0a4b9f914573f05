use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

pub const DEFAULT_WORK_TIME: i64 = 25;
pub const DEFAULT_BREAK_TIME: i64 = 5;
pub const DEFAULT_LONG_BREAK_TIME: i64 = 15;

/// The timer configuration row. There is exactly one, keyed at id 1.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRow {
    pub id: i64,
    pub work_time: i64,
    pub break_time: i64,
    pub long_break_time: i64,
    pub sessions_completed: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct SettingsRepo {
    db: Database,
}

impl SettingsRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the settings row, if one has been created yet.
    #[instrument(skip(self))]
    pub fn get(&self) -> Result<Option<SettingsRow>, StoreError> {
        self.db.with_conn(read_singleton)
    }

    /// Get the settings row, inserting the defaults (25/5/15/0) if absent.
    #[instrument(skip(self))]
    pub fn get_or_create(&self) -> Result<SettingsRow, StoreError> {
        self.db.with_conn(|conn| {
            if let Some(row) = read_singleton(conn)? {
                return Ok(row);
            }
            insert_defaults(conn)?;
            require_singleton(conn)
        })
    }

    /// Overwrite all four user fields. Creates the row if absent,
    /// preserving created_at across updates.
    #[instrument(skip(self))]
    pub fn update(
        &self,
        work_time: i64,
        break_time: i64,
        long_break_time: i64,
        sessions_completed: i64,
    ) -> Result<SettingsRow, StoreError> {
        self.upsert(work_time, break_time, long_break_time, sessions_completed)
    }

    /// Force the row back to the fixed defaults.
    #[instrument(skip(self))]
    pub fn reset(&self) -> Result<SettingsRow, StoreError> {
        self.upsert(
            DEFAULT_WORK_TIME,
            DEFAULT_BREAK_TIME,
            DEFAULT_LONG_BREAK_TIME,
            0,
        )
    }

    /// Add 1 to sessions_completed as a single UPDATE statement, so
    /// concurrent callers cannot lose counts. A fresh row starts at 0 and
    /// therefore reads 1 after its first increment.
    #[instrument(skip(self))]
    pub fn increment_sessions(&self) -> Result<SettingsRow, StoreError> {
        self.db.with_conn(|conn| {
            if read_singleton(conn)?.is_none() {
                insert_defaults(conn)?;
            }
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "UPDATE settings
                 SET sessions_completed = sessions_completed + 1, updated_at = ?1
                 WHERE id = 1",
                [now],
            )?;
            require_singleton(conn)
        })
    }

    fn upsert(
        &self,
        work_time: i64,
        break_time: i64,
        long_break_time: i64,
        sessions_completed: i64,
    ) -> Result<SettingsRow, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO settings (id, work_time, break_time, long_break_time, sessions_completed, created_at, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    work_time = excluded.work_time,
                    break_time = excluded.break_time,
                    long_break_time = excluded.long_break_time,
                    sessions_completed = excluded.sessions_completed,
                    updated_at = excluded.updated_at",
                rusqlite::params![work_time, break_time, long_break_time, sessions_completed, now],
            )?;
            require_singleton(conn)
        })
    }
}

fn insert_defaults(conn: &Connection) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO settings (id, work_time, break_time, long_break_time, sessions_completed, created_at, updated_at)
         VALUES (1, ?1, ?2, ?3, 0, ?4, ?4)",
        rusqlite::params![
            DEFAULT_WORK_TIME,
            DEFAULT_BREAK_TIME,
            DEFAULT_LONG_BREAK_TIME,
            now
        ],
    )?;
    Ok(())
}

fn read_singleton(conn: &Connection) -> Result<Option<SettingsRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, work_time, break_time, long_break_time, sessions_completed, created_at, updated_at
         FROM settings WHERE id = 1",
    )?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_settings(row)?)),
        None => Ok(None),
    }
}

fn require_singleton(conn: &Connection) -> Result<SettingsRow, StoreError> {
    read_singleton(conn)?
        .ok_or_else(|| StoreError::Database("settings row missing after write".into()))
}

fn row_to_settings(row: &rusqlite::Row<'_>) -> Result<SettingsRow, StoreError> {
    let created_at: String = row_helpers::get(row, 5, "settings", "created_at")?;
    let updated_at: String = row_helpers::get(row, 6, "settings", "updated_at")?;

    Ok(SettingsRow {
        id: row_helpers::get(row, 0, "settings", "id")?,
        work_time: row_helpers::get(row, 1, "settings", "work_time")?,
        break_time: row_helpers::get(row, 2, "settings", "break_time")?,
        long_break_time: row_helpers::get(row, 3, "settings", "long_break_time")?,
        sessions_completed: row_helpers::get(row, 4, "settings", "sessions_completed")?,
        created_at: row_helpers::parse_timestamp(&created_at, "settings", "created_at")?,
        updated_at: row_helpers::parse_timestamp(&updated_at, "settings", "updated_at")?,
    })
}

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// Kind of completed interval a task records.
/// Stored and serialized as its wire label (work/break/longBreak).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    Work,
    Break,
    LongBreak,
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Work => write!(f, "work"),
            Self::Break => write!(f, "break"),
            Self::LongBreak => write!(f, "longBreak"),
        }
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Self::Work),
            "break" => Ok(Self::Break),
            "longBreak" => Ok(Self::LongBreak),
            other => Err(format!("unknown session type: {other}")),
        }
    }
}

/// User-supplied fields for creating or fully replacing a task.
/// duration is reported by the caller and deliberately not derived from
/// start_time/end_time (a paused timer can make them disagree).
#[derive(Clone, Debug)]
pub struct NewTask {
    pub task_name: String,
    pub session_type: SessionType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: i64,
    pub task_name: String,
    pub session_type: SessionType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct TaskRepo {
    db: Database,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All tasks, newest first.
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<TaskRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_name, session_type, start_time, end_time, duration, created_at, updated_at
                 FROM tasks ORDER BY created_at DESC, id DESC",
            )?;
            let tasks = collect_tasks(stmt.query([])?);
            tasks
        })
    }

    /// Get a task by id.
    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<TaskRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_name, session_type, start_time, end_time, duration, created_at, updated_at
                 FROM tasks WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => row_to_task(row),
                None => Err(StoreError::NotFound(format!("task {id}"))),
            }
        })
    }

    /// Insert a new task and return the persisted row.
    #[instrument(skip(self, task), fields(task_name = %task.task_name, session_type = %task.session_type))]
    pub fn create(&self, task: &NewTask) -> Result<TaskRow, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO tasks (task_name, session_type, start_time, end_time, duration, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![
                    task.task_name,
                    task.session_type.to_string(),
                    task.start_time.to_rfc3339(),
                    task.end_time.to_rfc3339(),
                    task.duration,
                    now.to_rfc3339(),
                ],
            )?;

            Ok(TaskRow {
                id: conn.last_insert_rowid(),
                task_name: task.task_name.clone(),
                session_type: task.session_type,
                start_time: task.start_time,
                end_time: task.end_time,
                duration: task.duration,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Replace all user fields of a task. created_at stays system-managed.
    #[instrument(skip(self, task), fields(task_name = %task.task_name))]
    pub fn update(&self, id: i64, task: &NewTask) -> Result<TaskRow, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let affected = conn.execute(
                "UPDATE tasks
                 SET task_name = ?1, session_type = ?2, start_time = ?3, end_time = ?4,
                     duration = ?5, updated_at = ?6
                 WHERE id = ?7",
                rusqlite::params![
                    task.task_name,
                    task.session_type.to_string(),
                    task.start_time.to_rfc3339(),
                    task.end_time.to_rfc3339(),
                    task.duration,
                    now,
                    id,
                ],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }

            let mut stmt = conn.prepare(
                "SELECT id, task_name, session_type, start_time, end_time, duration, created_at, updated_at
                 FROM tasks WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => row_to_task(row),
                None => Err(StoreError::NotFound(format!("task {id}"))),
            }
        })
    }

    /// Delete a task by id.
    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
    }

    /// Tasks whose created_at falls in [start, end], newest first.
    #[instrument(skip(self))]
    pub fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TaskRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_name, session_type, start_time, end_time, duration, created_at, updated_at
                 FROM tasks WHERE created_at >= ?1 AND created_at <= ?2
                 ORDER BY created_at DESC, id DESC",
            )?;
            let tasks = collect_tasks(stmt.query(rusqlite::params![start.to_rfc3339(), end.to_rfc3339()])?);
            tasks
        })
    }

    /// Tasks created on the given UTC calendar date.
    pub fn list_created_on(&self, date: NaiveDate) -> Result<Vec<TaskRow>, StoreError> {
        let (start, end) = day_bounds(date);
        self.list_created_between(start, end)
    }

    /// Tasks created on the current UTC date. The window is recomputed on
    /// every call.
    pub fn list_for_today(&self) -> Result<Vec<TaskRow>, StoreError> {
        self.list_created_on(Utc::now().date_naive())
    }

    /// Sum of duration over tasks created on the given UTC date; 0 if none.
    #[instrument(skip(self))]
    pub fn total_duration_for_date(&self, date: NaiveDate) -> Result<i64, StoreError> {
        let (start, end) = day_bounds(date);
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(duration), 0) FROM tasks
                 WHERE created_at >= ?1 AND created_at <= ?2",
                rusqlite::params![start.to_rfc3339(), end.to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
    }

    /// Sum of duration over today's tasks (UTC), 0 if none.
    pub fn total_duration_for_today(&self) -> Result<i64, StoreError> {
        self.total_duration_for_date(Utc::now().date_naive())
    }

    /// Case-insensitive substring match on task_name, newest first.
    #[instrument(skip(self))]
    pub fn search_by_name(&self, query: &str) -> Result<Vec<TaskRow>, StoreError> {
        let pattern = format!("%{}%", row_helpers::escape_like(query));
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_name, session_type, start_time, end_time, duration, created_at, updated_at
                 FROM tasks WHERE task_name LIKE ?1 ESCAPE '\\'
                 ORDER BY created_at DESC, id DESC",
            )?;
            let tasks = collect_tasks(stmt.query([&pattern])?);
            tasks
        })
    }
}

/// Inclusive bounds of a UTC calendar day, matching the stored RFC 3339
/// text: every created_at is written with a +00:00 offset, so string
/// comparison in SQL agrees with chronological order.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1) - Duration::nanoseconds(1);
    (start, end)
}

fn collect_tasks(mut rows: rusqlite::Rows<'_>) -> Result<Vec<TaskRow>, StoreError> {
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        results.push(row_to_task(row)?);
    }
    Ok(results)
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<TaskRow, StoreError> {
    let session_type: String = row_helpers::get(row, 2, "tasks", "session_type")?;
    let start_time: String = row_helpers::get(row, 3, "tasks", "start_time")?;
    let end_time: String = row_helpers::get(row, 4, "tasks", "end_time")?;
    let created_at: String = row_helpers::get(row, 6, "tasks", "created_at")?;
    let updated_at: String = row_helpers::get(row, 7, "tasks", "updated_at")?;

    Ok(TaskRow {
        id: row_helpers::get(row, 0, "tasks", "id")?,
        task_name: row_helpers::get(row, 1, "tasks", "task_name")?,
        session_type: row_helpers::parse_enum(&session_type, "tasks", "session_type")?,
        start_time: row_helpers::parse_timestamp(&start_time, "tasks", "start_time")?,
        end_time: row_helpers::parse_timestamp(&end_time, "tasks", "end_time")?,
        duration: row_helpers::get(row, 5, "tasks", "duration")?,
        created_at: row_helpers::parse_timestamp(&created_at, "tasks", "created_at")?,
        updated_at: row_helpers::parse_timestamp(&updated_at, "tasks", "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> TaskRepo {
        TaskRepo::new(Database::in_memory().unwrap())
    }

    fn draft(name: &str, session_type: SessionType, duration: i64) -> NewTask {
        let start = Utc::now();
        NewTask {
            task_name: name.to_string(),
            session_type,
            start_time: start,
            end_time: start + Duration::minutes(duration),
            duration,
        }
    }

    #[test]
    fn create_assigns_id_and_timestamps() {
        let repo = test_repo();
        let task = repo.create(&draft("Write report", SessionType::Work, 25)).unwrap();
        assert!(task.id >= 1);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn create_then_get_round_trips_user_fields() {
        let repo = test_repo();
        let input = draft("Write report", SessionType::Work, 25);
        let created = repo.create(&input).unwrap();
        let fetched = repo.get(created.id).unwrap();
        assert_eq!(fetched.task_name, "Write report");
        assert_eq!(fetched.session_type, SessionType::Work);
        assert_eq!(fetched.duration, 25);
        assert_eq!(fetched.start_time, created.start_time);
        assert_eq!(fetched.end_time, created.end_time);
    }

    #[test]
    fn get_missing_is_not_found() {
        let repo = test_repo();
        assert!(matches!(repo.get(999), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn list_all_newest_first() {
        let repo = test_repo();
        let first = repo.create(&draft("older", SessionType::Work, 25)).unwrap();
        let second = repo.create(&draft("newer", SessionType::Break, 5)).unwrap();
        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[test]
    fn update_replaces_user_fields() {
        let repo = test_repo();
        let created = repo.create(&draft("draft", SessionType::Work, 25)).unwrap();
        let updated = repo
            .update(created.id, &draft("final", SessionType::LongBreak, 15))
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.task_name, "final");
        assert_eq!(updated.session_type, SessionType::LongBreak);
        assert_eq!(updated.duration, 15);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn update_missing_is_not_found() {
        let repo = test_repo();
        let result = repo.update(999, &draft("ghost", SessionType::Work, 25));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let repo = test_repo();
        let created = repo.create(&draft("done", SessionType::Work, 25)).unwrap();
        repo.delete(created.id).unwrap();
        assert!(matches!(repo.get(created.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_missing_is_not_found_without_side_effects() {
        let repo = test_repo();
        repo.create(&draft("kept", SessionType::Work, 25)).unwrap();
        assert!(matches!(repo.delete(999), Err(StoreError::NotFound(_))));
        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn list_created_between_is_inclusive() {
        let repo = test_repo();
        let created = repo.create(&draft("now", SessionType::Work, 25)).unwrap();

        let hits = repo
            .list_created_between(created.created_at, created.created_at)
            .unwrap();
        assert_eq!(hits.len(), 1);

        let earlier = created.created_at - Duration::hours(2);
        let misses = repo
            .list_created_between(earlier, earlier + Duration::hours(1))
            .unwrap();
        assert!(misses.is_empty());
    }

    #[test]
    fn list_for_today_sees_fresh_tasks() {
        let repo = test_repo();
        repo.create(&draft("fresh", SessionType::Work, 25)).unwrap();
        let today = repo.list_for_today().unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].task_name, "fresh");
    }

    #[test]
    fn total_duration_for_today_sums_minutes() {
        let repo = test_repo();
        repo.create(&draft("work", SessionType::Work, 25)).unwrap();
        repo.create(&draft("break", SessionType::Break, 5)).unwrap();
        assert_eq!(repo.total_duration_for_today().unwrap(), 30);
    }

    #[test]
    fn total_duration_is_zero_when_empty() {
        let repo = test_repo();
        assert_eq!(repo.total_duration_for_today().unwrap(), 0);
    }

    #[test]
    fn total_duration_for_other_date_is_zero() {
        let repo = test_repo();
        repo.create(&draft("today only", SessionType::Work, 25)).unwrap();
        let last_week = Utc::now().date_naive() - Duration::days(7);
        assert_eq!(repo.total_duration_for_date(last_week).unwrap(), 0);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let repo = test_repo();
        repo.create(&draft("Foobar", SessionType::Work, 25)).unwrap();
        repo.create(&draft("FOOBAR", SessionType::Work, 25)).unwrap();
        repo.create(&draft("bar", SessionType::Break, 5)).unwrap();

        let hits = repo.search_by_name("foo").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|t| t.task_name.to_lowercase().contains("foo")));
    }

    #[test]
    fn search_escapes_like_metacharacters() {
        let repo = test_repo();
        repo.create(&draft("100% focus", SessionType::Work, 25)).unwrap();
        repo.create(&draft("1000 focus", SessionType::Work, 25)).unwrap();

        let hits = repo.search_by_name("0%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].task_name, "100% focus");
    }

    #[test]
    fn session_type_labels_round_trip() {
        for (label, variant) in [
            ("work", SessionType::Work),
            ("break", SessionType::Break),
            ("longBreak", SessionType::LongBreak),
        ] {
            assert_eq!(label.parse::<SessionType>().unwrap(), variant);
            assert_eq!(variant.to_string(), label);
        }
        assert!("siesta".parse::<SessionType>().is_err());
    }

    #[test]
    fn invalid_session_type_in_store_returns_corrupt_row() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now().to_rfc3339();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (task_name, session_type, start_time, end_time, duration, created_at, updated_at)
                 VALUES ('bad', 'INVALID', ?1, ?1, 25, ?1, ?1)",
                [&now],
            )?;
            Ok(())
        })
        .unwrap();

        let repo = TaskRepo::new(db);
        let result = repo.get(1);
        assert!(matches!(result, Err(StoreError::CorruptRow { .. })));
    }
}

/// SQL DDL for the pomod database.
/// WAL mode + a 5s busy timeout applied at connection time.
pub const SCHEMA_VERSION: u32 = 1;

/// The settings table is a true singleton: the CHECK pins the only
/// legal key to 1, so "the settings row" is unambiguous.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    work_time INTEGER NOT NULL CHECK (work_time >= 1),
    break_time INTEGER NOT NULL CHECK (break_time >= 1),
    long_break_time INTEGER NOT NULL CHECK (long_break_time >= 1),
    sessions_completed INTEGER NOT NULL DEFAULT 0 CHECK (sessions_completed >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_name TEXT NOT NULL,
    session_type TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    duration INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at);
CREATE INDEX IF NOT EXISTS idx_tasks_name ON tasks(task_name);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;

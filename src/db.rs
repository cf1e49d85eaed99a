use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "school.sqlite3";

/// Ordered schema migrations. A database at `PRAGMA user_version = n` gets
/// every entry with a version above `n`, in order, exactly once.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "CREATE TABLE users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        password TEXT NOT NULL
    );
    CREATE UNIQUE INDEX idx_users_name ON users(name);

    CREATE TABLE students(
        student_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        class INTEGER NOT NULL,
        roll_no INTEGER NOT NULL
    );
    CREATE INDEX idx_students_class ON students(class);
    CREATE UNIQUE INDEX idx_students_class_roll ON students(class, roll_no);

    CREATE TABLE attendance(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        class INTEGER NOT NULL,
        date TEXT NOT NULL,
        status TEXT NOT NULL
    );
    CREATE INDEX idx_attendance_date ON attendance(date);
    CREATE INDEX idx_attendance_student ON attendance(student_id);

    CREATE TABLE local_slots(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );",
)];

pub fn schema_version() -> i64 {
    MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0)
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    migrate(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    Ok(conn)
}

/// Applies pending migrations. Returns how many ran; an up-to-date database
/// returns 0 and is left untouched.
pub fn migrate(conn: &Connection) -> anyhow::Result<usize> {
    let current = user_version(conn)?;
    let pending: Vec<&(i64, &str)> = MIGRATIONS.iter().filter(|(v, _)| *v > current).collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    for &(version, sql) in pending.iter().copied() {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tracing::info!(version, "applied schema migration");
    }
    tx.commit()?;
    Ok(pending.len())
}

pub fn user_version(conn: &Connection) -> anyhow::Result<i64> {
    let v: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(v)
}

pub fn slot_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM local_slots WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn slot_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let raw = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO local_slots(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, raw),
    )?;
    Ok(())
}

pub fn slot_remove(conn: &Connection, key: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM local_slots WHERE key = ?", [key])?;
    Ok(n > 0)
}

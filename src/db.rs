//! Local SQLite database backing the fallback store.
//!
//! Uses rusqlite with WAL mode. The only table the storefront needs is
//! `local_settings`, a category/key/value table that holds the serialized
//! order and product collections plus a few per-user values.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Shared database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Schema steps in order; step `n` (zero-based) produces version `n + 1`.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "key/value collections",
        "CREATE TABLE IF NOT EXISTS local_settings (
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now')),
            PRIMARY KEY (setting_category, setting_key)
        );",
    ),
    (
        "category index",
        "CREATE INDEX IF NOT EXISTS idx_local_settings_category
            ON local_settings (setting_category);",
    ),
];

pub const CURRENT_SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

const DB_FILE_NAME: &str = "bakery.db";

/// Initialize the database at `{data_dir}/bakery.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(data_dir: &Path) -> Result<DbState, String> {
    fs::create_dir_all(data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

    let db_path = data_dir.join(DB_FILE_NAME);
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path).and_then(|c| {
        run_migrations(&c)?;
        Ok(c)
    }) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            let conn = open_and_configure(&db_path)
                .map_err(|e| format!("Database open failed after retry: {e}"))?;
            run_migrations(&conn)?;
            conn
        }
    };

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// In-memory database with the full schema, for tests and throwaway runs.
pub fn open_in_memory() -> Result<DbState, String> {
    let conn = Connection::open_in_memory().map_err(|e| format!("sqlite open: {e}"))?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;
    run_migrations(&conn)?;
    Ok(DbState {
        conn: Mutex::new(conn),
        db_path: PathBuf::from(":memory:"),
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;

    Ok(conn)
}

/// Apply every step newer than the recorded schema version.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    for (idx, (label, sql)) in MIGRATIONS.iter().enumerate() {
        let version = idx as i32 + 1;
        if version <= current {
            continue;
        }
        info!(version, label, "applying schema migration");
        conn.execute_batch(sql)
            .map_err(|e| format!("migrate v{version} ({label}): {e}"))?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![version],
        )
        .map_err(|e| format!("record schema v{version}: {e}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Read a single setting. Returns `None` when absent or unreadable.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(
    conn: &Connection,
    category: &str,
    key: &str,
    value: &str,
) -> Result<(), String> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )
    .map_err(|e| format!("set_setting: {e}"))?;
    Ok(())
}

/// Remove a setting. Returns whether a row was deleted.
pub fn delete_setting(conn: &Connection, category: &str, key: &str) -> Result<bool, String> {
    let removed = conn
        .execute(
            "DELETE FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
            params![category, key],
        )
        .map_err(|e| format!("delete_setting: {e}"))?;
    Ok(removed > 0)
}

// ===========================================================================
// Tests
// ===========================================================================

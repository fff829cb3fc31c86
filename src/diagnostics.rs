//! Diagnostics for the storefront backend.
//!
//! Provides:
//! - **About info**: version, build timestamp, git SHA, platform
//! - **Status**: active backend, local database schema and size, local
//!   collection sizes
//! - **Log rotation helpers**: used by `lib.rs` to configure rolling log files.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::warn;

use crate::config::Settings;
use crate::db::DbState;
use crate::local_store::{ORDERS_KEY, PRODUCTS_KEY};

/// Maximum number of log files to retain.
pub const MAX_LOG_FILES: usize = 10;

/// Prefix of the daily log files (`bakery.log.2026-10-17`).
pub const LOG_FILE_PREFIX: &str = "bakery.log";

// ---------------------------------------------------------------------------
// About info
// ---------------------------------------------------------------------------

/// Returns version, build timestamp, git SHA, and platform info.
pub fn about_info() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "buildTimestamp": env!("BUILD_TIMESTAMP"),
        "gitSha": env!("BUILD_GIT_SHA"),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "rustVersion": env!("CARGO_PKG_RUST_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Number of records in a locally stored collection, or `null` when the
/// entry is missing or unreadable.
fn local_collection_len(conn: &rusqlite::Connection, key: &str) -> Value {
    crate::db::get_setting(conn, "local", key)
        .and_then(|raw| serde_json::from_str::<Vec<Value>>(&raw).ok())
        .map(|items| json!(items.len()))
        .unwrap_or(Value::Null)
}

/// Backend mode plus local database facts. The access key is never
/// included.
pub fn status(settings: &Settings, db: &DbState) -> Result<Value, String> {
    let (schema_version, local_orders, local_products) = {
        let conn = db.conn.lock().map_err(|e| e.to_string())?;
        let schema_version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<i32>>(0)
            })
            .ok()
            .flatten()
            .unwrap_or(0);
        (
            schema_version,
            local_collection_len(&conn, ORDERS_KEY),
            local_collection_len(&conn, PRODUCTS_KEY),
        )
    };
    let db_size = fs::metadata(&db.db_path).map(|m| m.len()).unwrap_or(0);
    let remote = settings.remote();

    Ok(json!({
        "backend": if remote.is_some() { "remote" } else { "local" },
        "remoteUrl": remote.as_ref().map(|r| r.url.clone()),
        "storageBucket": settings.storage_bucket,
        "apiBaseUrl": settings.api_base_url,
        "adminConfigured": settings.admin_password_hash.is_some(),
        "dataDir": settings.data_dir.display().to_string(),
        "schemaVersion": schema_version,
        "dbSizeBytes": db_size,
        "localOrders": local_orders,
        "localProducts": local_products,
    }))
}

// ---------------------------------------------------------------------------
// Log rotation
// ---------------------------------------------------------------------------

/// Log directory under the data dir (same location used by lib.rs).
pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Prune old log files, keeping only the most recent `MAX_LOG_FILES`.
pub fn prune_old_logs(log_dir: &Path) {
    if !log_dir.exists() {
        return;
    }

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    if let Ok(entries) = fs::read_dir(log_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
            if is_log {
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(std::time::UNIX_EPOCH);
                log_files.push((path, modified));
            }
        }
    }

    // Sort newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to prune log file {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::{KeyValueStore, SqliteKvStore};
    use std::sync::Arc;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "samyra_diag_{tag}_{}_{}",
            std::process::id(),
            crate::ids::new_id("T")
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_about_info_has_required_fields() {
        let info = about_info();
        for key in ["version", "buildTimestamp", "gitSha", "platform", "arch"] {
            assert!(info.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_status_reports_local_mode_and_counts() {
        let dir = temp_dir("status");
        let db = Arc::new(crate::db::init(&dir).unwrap());
        SqliteKvStore::new(db.clone())
            .write_raw(ORDERS_KEY, r#"[{"id":"a"},{"id":"b"}]"#)
            .unwrap();

        let mut settings = Settings::local_only(dir.clone());
        settings.supabase_anon_key = Some("secret-key".into());
        let status = status(&settings, &db).unwrap();
        assert_eq!(status["backend"], "local");
        assert_eq!(status["localOrders"], 2);
        assert_eq!(status["localProducts"], Value::Null);
        assert_eq!(status["schemaVersion"], crate::db::CURRENT_SCHEMA_VERSION);
        assert!(!status.to_string().contains("secret-key"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_prune_keeps_newest_log_files_only() {
        let dir = temp_dir("logs");
        for day in 1..=12 {
            fs::write(dir.join(format!("{LOG_FILE_PREFIX}.2026-10-{day:02}")), "x").unwrap();
        }
        fs::write(dir.join("unrelated.txt"), "keep").unwrap();

        prune_old_logs(&dir);

        let remaining: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        let logs = remaining
            .iter()
            .filter(|n| n.starts_with(LOG_FILE_PREFIX))
            .count();
        assert_eq!(logs, MAX_LOG_FILES);
        assert!(remaining.contains(&"unrelated.txt".to_string()));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_log_dir_under_data_dir() {
        assert_eq!(
            log_dir(Path::new("/srv/bakery")),
            PathBuf::from("/srv/bakery/logs")
        );
    }
}

// src/db/schema.rs
// Database schema and migrations

use anyhow::Result;
use rusqlite::Connection;

/// Base schema. Timestamps are TEXT in `%Y-%m-%d %H:%M:%S%.3f` UTC so that
/// lexicographic comparison matches chronological order (the rollup window
/// predicate relies on this).
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS faults (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    guid TEXT NOT NULL UNIQUE,
    application_name TEXT NOT NULL,
    machine_name TEXT NOT NULL DEFAULT '',
    error_type TEXT NOT NULL DEFAULT '',
    source TEXT NOT NULL DEFAULT '',
    message TEXT NOT NULL DEFAULT '',
    detail TEXT NOT NULL DEFAULT '',
    host TEXT,
    url TEXT,
    http_method TEXT,
    ip_address TEXT,
    status_code INTEGER,
    error_hash INTEGER,
    duplicate_count INTEGER NOT NULL DEFAULT 1,
    is_protected INTEGER NOT NULL DEFAULT 0,
    full_json TEXT,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_faults_rollup
    ON faults (error_hash, application_name, created_at);

CREATE INDEX IF NOT EXISTS idx_faults_recent
    ON faults (created_at DESC);
";

/// Run all schema setup and migrations.
///
/// Called during pool initialization. Idempotent — base tables use
/// IF NOT EXISTS and column migrations check before altering.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// True if `table` has a column named `column`. Kept for additive column
/// migrations as the schema evolves.
#[allow(dead_code)]
pub(crate) fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let sql = format!("SELECT 1 FROM pragma_table_info('{table}') WHERE name = ?1");
    conn.query_row(&sql, [column], |_| Ok(true)).unwrap_or(false)
}

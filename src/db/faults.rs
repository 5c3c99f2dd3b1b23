// src/db/faults.rs
// Synchronous fault storage operations — the atomic match-or-insert lives here

use crate::fault::{truncate, Fault};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

/// Storage format for timestamps. Fixed-width UTC so lexicographic order is
/// chronological order; the window predicate compares these as strings.
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
/// Parse format (`%.f` also accepts values without a fractional part, e.g.
/// rows backdated via SQLite's datetime()).
const TS_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
/// Window cutoff format. Second precision, so it compares cleanly against
/// both millisecond-precision and plain datetime() values.
const MIN_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Storage limits for bounded columns. Over-length values are truncated at
// insert, never rejected.
const MAX_APPLICATION_NAME: usize = 50;
const MAX_MACHINE_NAME: usize = 50;
const MAX_TYPE: usize = 100;
const MAX_HOST: usize = 100;
const MAX_URL: usize = 500;
const MAX_HTTP_METHOD: usize = 10;
const MAX_SOURCE: usize = 100;
const MAX_MESSAGE: usize = 1000;

const FAULT_COLUMNS: &str = "guid, application_name, machine_name, error_type, source, message, \
     detail, host, url, http_method, ip_address, status_code, error_hash, \
     duplicate_count, is_protected, full_json, created_at";

/// Result of the match-or-insert: the durable record's guid, and whether the
/// incoming fault merged into a pre-existing record.
#[derive(Debug, Clone, Copy)]
pub struct RecordedFault {
    pub guid: Uuid,
    pub merged: bool,
}

/// Atomically roll the fault up into a matching recent record, or insert it
/// as a new one.
///
/// Runs inside an IMMEDIATE transaction: SQLite admits a single writer, so
/// no two callers can both observe "no match" and both insert. The match
/// predicate is equal fingerprint + application, not deleted, created within
/// the trailing window; ties break to the most recently created row (then
/// highest id) so concurrent batches increment the same row.
pub fn record_fault_sync(
    conn: &mut Connection,
    fault: &Fault,
    full_json: &str,
    window: chrono::Duration,
) -> rusqlite::Result<RecordedFault> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Faults without a fingerprint (empty detail) never roll up.
    if let Some(hash) = fault.error_hash {
        let min_date = (Utc::now() - window).format(MIN_DATE_FORMAT).to_string();
        let existing: Option<String> = tx
            .query_row(
                "UPDATE faults
                    SET duplicate_count = duplicate_count + ?1
                  WHERE id = (SELECT id FROM faults
                               WHERE error_hash = ?2
                                 AND application_name = ?3
                                 AND deleted_at IS NULL
                                 AND created_at >= ?4
                               ORDER BY created_at DESC, id DESC
                               LIMIT 1)
              RETURNING guid",
                params![
                    fault.duplicate_count,
                    hash,
                    truncate(&fault.application_name, MAX_APPLICATION_NAME),
                    min_date
                ],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(guid) = existing {
            tx.commit()?;
            return Ok(RecordedFault {
                guid: parse_guid(&guid)?,
                merged: true,
            });
        }
    }

    tx.execute(
        "INSERT INTO faults (guid, application_name, machine_name, created_at, error_type,
                             is_protected, host, url, http_method, ip_address, source,
                             message, detail, status_code, full_json, error_hash,
                             duplicate_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            fault.guid.to_string(),
            truncate(&fault.application_name, MAX_APPLICATION_NAME),
            truncate(&fault.machine_name, MAX_MACHINE_NAME),
            fault.created_at.format(TS_FORMAT).to_string(),
            truncate(&fault.error_type, MAX_TYPE),
            fault.is_protected,
            fault.host.as_deref().map(|s| truncate(s, MAX_HOST).into_owned()),
            fault.url.as_deref().map(|s| truncate(s, MAX_URL).into_owned()),
            fault
                .http_method
                .as_deref()
                .map(|s| truncate(s, MAX_HTTP_METHOD).into_owned()),
            fault.ip_address,
            truncate(&fault.source, MAX_SOURCE),
            truncate(&fault.message, MAX_MESSAGE),
            fault.detail,
            fault.status_code,
            full_json,
            fault.error_hash,
            fault.duplicate_count,
        ],
    )?;
    tx.commit()?;

    Ok(RecordedFault {
        guid: fault.guid,
        merged: false,
    })
}

/// Fetch one fault by guid, including soft-deleted rows.
pub fn get_fault_sync(conn: &Connection, guid: &Uuid) -> rusqlite::Result<Option<Fault>> {
    conn.query_row(
        &format!("SELECT {FAULT_COLUMNS} FROM faults WHERE guid = ?1"),
        params![guid.to_string()],
        fault_from_row,
    )
    .optional()
}

/// Most recent non-deleted faults, newest first.
pub fn recent_faults_sync(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<Fault>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FAULT_COLUMNS} FROM faults
          WHERE deleted_at IS NULL
          ORDER BY created_at DESC, id DESC
          LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit as i64], fault_from_row)?;
    rows.collect()
}

/// Mark a fault as protected from deletion. Returns false if no such row.
pub fn protect_fault_sync(conn: &Connection, guid: &Uuid) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE faults SET is_protected = 1 WHERE guid = ?1",
        params![guid.to_string()],
    )?;
    Ok(changed > 0)
}

/// Soft-delete a fault. Protected and already-deleted rows are left alone;
/// returns whether a row was deleted. Deleted rows stop matching as rollup
/// targets.
pub fn delete_fault_sync(conn: &Connection, guid: &Uuid) -> rusqlite::Result<bool> {
    let now = Utc::now().format(TS_FORMAT).to_string();
    let changed = conn.execute(
        "UPDATE faults SET deleted_at = ?1
          WHERE guid = ?2 AND is_protected = 0 AND deleted_at IS NULL",
        params![now, guid.to_string()],
    )?;
    Ok(changed > 0)
}

fn fault_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Fault> {
    let guid: String = row.get(0)?;
    let created_at: String = row.get(16)?;
    Ok(Fault {
        guid: parse_guid(&guid)?,
        application_name: row.get(1)?,
        machine_name: row.get(2)?,
        error_type: row.get(3)?,
        source: row.get(4)?,
        message: row.get(5)?,
        detail: row.get(6)?,
        host: row.get(7)?,
        url: row.get(8)?,
        http_method: row.get(9)?,
        ip_address: row.get(10)?,
        status_code: row.get(11)?,
        error_hash: row.get(12)?,
        duplicate_count: row.get(13)?,
        is_protected: row.get(14)?,
        full_json: row.get(15)?,
        created_at: parse_ts(&created_at)?,
        is_duplicate: false,
    })
}

fn parse_guid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TS_PARSE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(16, rusqlite::types::Type::Text, Box::new(e))
        })
}

use std::path::Path;

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::error::{ReplayError, Result};
use crate::testing::RunReport;

/// One past run as stored in the history database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: i64,
    pub corpus: String,
    pub base_url: String,
    pub total: i64,
    pub passed: i64,
    pub failed: i64,
    pub skipped: i64,
    pub duration_ms: i64,
    pub report_json: String,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| ReplayError::io(parent, err))?;
    }

    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS runs (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         started_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
         corpus TEXT NOT NULL,
         base_url TEXT NOT NULL,
         total INTEGER NOT NULL,
         passed INTEGER NOT NULL,
         failed INTEGER NOT NULL,
         skipped INTEGER NOT NULL,
         duration_ms INTEGER NOT NULL,
         report_json TEXT NOT NULL
       );",
    )?;

    Ok(conn)
}

pub fn record_run(conn: &Connection, corpus: &str, report: &RunReport) -> Result<i64> {
    let report_json = serde_json::to_string(report)?;
    conn.execute(
        "INSERT INTO runs (corpus, base_url, total, passed, failed, skipped, duration_ms, report_json)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            corpus,
            report.base_url,
            count(report.total),
            count(report.passed),
            count(report.failed),
            count(report.skipped),
            i64::try_from(report.duration_ms).unwrap_or(i64::MAX),
            report_json,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent runs first.
pub fn list_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRecord>> {
    let mut statement = conn.prepare(
        "SELECT id, started_at, corpus, base_url, total, passed, failed, skipped, duration_ms, report_json
       FROM runs ORDER BY id DESC LIMIT ?1;",
    )?;
    let rows = statement.query_map(params![count(limit)], |row| {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            corpus: row.get(2)?,
            base_url: row.get(3)?,
            total: row.get(4)?,
            passed: row.get(5)?,
            failed: row.get(6)?,
            skipped: row.get(7)?,
            duration_ms: row.get(8)?,
            report_json: row.get(9)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

fn count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

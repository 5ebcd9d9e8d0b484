//! SQLite audit sink.
//!
//! Verdict records land in a `guard_log` table, append-only. The same
//! [`DbPool`] type is used as for the directory store; the audit log may
//! share a database file with it or live in its own.

use rusqlite::Connection;

use crate::audit::{AuditEntry, AuditSink};
use crate::error::{OrgSentryError, Result};
use crate::store::sqlite::DbPool;

/// Initialize the audit schema if it doesn't exist.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS guard_log (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp    TEXT NOT NULL,
            verdict      TEXT NOT NULL,
            reason       TEXT NOT NULL,
            detail       TEXT NOT NULL,
            risk_level   TEXT NOT NULL,
            action_taken TEXT NOT NULL,
            email        TEXT NOT NULL,
            domain       TEXT NOT NULL,
            role         TEXT NOT NULL,
            org_id       TEXT,
            action       TEXT,
            ip           TEXT,
            payload      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_guard_log_timestamp ON guard_log(timestamp);
        CREATE INDEX IF NOT EXISTS idx_guard_log_email ON guard_log(email);",
    )?;
    Ok(())
}

/// Append one entry to the `guard_log` table.
pub fn append_entry(conn: &Connection, entry: &AuditEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO guard_log (timestamp, verdict, reason, detail, risk_level, action_taken,
                                email, domain, role, org_id, action, ip, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            entry.timestamp,
            entry.verdict,
            entry.reason,
            entry.detail,
            entry.risk_level,
            entry.action_taken,
            entry.email,
            entry.domain,
            entry.role,
            entry.org_id,
            entry.action,
            entry.ip,
            entry.payload,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Query the most recent N audit entries.
pub fn query_recent(conn: &Connection, limit: usize) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, verdict, reason, detail, risk_level, action_taken,
                email, domain, role, org_id, action, ip, payload
         FROM guard_log ORDER BY id DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(rusqlite::params![limit as i64], |row| {
        Ok(AuditEntry {
            id: Some(row.get(0)?),
            timestamp: row.get(1)?,
            verdict: row.get(2)?,
            reason: row.get(3)?,
            detail: row.get(4)?,
            risk_level: row.get(5)?,
            action_taken: row.get(6)?,
            email: row.get(7)?,
            domain: row.get(8)?,
            role: row.get(9)?,
            org_id: row.get(10)?,
            action: row.get(11)?,
            ip: row.get(12)?,
            payload: row.get(13)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Aggregated verdict counts from the `guard_log` table.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AuditStats {
    pub total: usize,
    pub allowed: usize,
    pub blocked: usize,
    pub escalated: usize,
}

/// Query aggregated verdict counts grouped by verdict.
///
/// Uses SQL `COUNT(*) GROUP BY verdict` for efficient aggregation without
/// loading all rows into memory.
pub fn query_stats(conn: &Connection) -> Result<AuditStats> {
    let mut stmt = conn.prepare("SELECT verdict, COUNT(*) FROM guard_log GROUP BY verdict")?;
    let rows = stmt.query_map([], |row| {
        let verdict: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        Ok((verdict, count as usize))
    })?;

    let mut stats = AuditStats::default();
    for row in rows {
        let (verdict, count) = row?;
        stats.total += count;
        match verdict.as_str() {
            "allow" => stats.allowed = count,
            "block" => stats.blocked = count,
            "escalate" => stats.escalated = count,
            _ => {} // unknown verdicts still count in total
        }
    }
    Ok(stats)
}

/// Audit sink writing to the `guard_log` table through a connection pool.
#[derive(Clone)]
pub struct SqliteAuditSink {
    pool: DbPool,
}

impl SqliteAuditSink {
    /// Wrap a pool, creating the audit schema if needed.
    pub fn new(pool: DbPool) -> Result<Self> {
        let conn = pool.get().map_err(|e| OrgSentryError::Pool(e.to_string()))?;
        init_db(&conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl AuditSink for SqliteAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let conn = self.pool.get().map_err(|e| OrgSentryError::Pool(e.to_string()))?;
        append_entry(&conn, entry)?;
        Ok(())
    }
}

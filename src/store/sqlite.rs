//! SQLite-backed directory store.
//!
//! Organizations, registered domains, members, and sessions live in four
//! tables accessed through an [`r2d2`] connection pool for thread-safe reads
//! from async tasks. The engine only ever reads these tables; writes happen
//! through whatever provisioning path owns the directory (the CLI `init`
//! command seeds the schema).

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::error::{OrgSentryError, Result};
use crate::store::{DirectoryStore, OrgDomain, Organization, Plan, Session};

/// SQLite connection pool type alias (r2d2 + r2d2-sqlite).
pub type DbPool = r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>;

/// Open a connection pool for the given database file path.
///
/// Creates the directory schema if it doesn't exist. The pool is configured
/// with a maximum of 4 connections.
pub fn open_pool(path: &std::path::Path) -> Result<DbPool> {
    let manager = r2d2_sqlite::SqliteConnectionManager::file(path);
    let pool = r2d2::Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| OrgSentryError::Pool(e.to_string()))?;
    let conn = pool.get().map_err(|e| OrgSentryError::Pool(e.to_string()))?;
    init_db(&conn)?;
    Ok(pool)
}

/// Open an in-memory connection pool (for testing).
///
/// Limited to a single connection so all handles see the same database.
pub fn open_memory_pool() -> Result<DbPool> {
    let manager = r2d2_sqlite::SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| OrgSentryError::Pool(e.to_string()))?;
    let conn = pool.get().map_err(|e| OrgSentryError::Pool(e.to_string()))?;
    init_db(&conn)?;
    Ok(pool)
}

/// Initialize the directory schema if it doesn't exist.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS organizations (
            id                   TEXT PRIMARY KEY,
            plan                 TEXT NOT NULL,
            restrict_same_domain INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS org_domains (
            org_id TEXT NOT NULL REFERENCES organizations(id),
            domain TEXT NOT NULL,
            plan   TEXT,
            PRIMARY KEY (org_id, domain)
        );
        CREATE TABLE IF NOT EXISTS members (
            org_id TEXT NOT NULL REFERENCES organizations(id),
            email  TEXT NOT NULL,
            role   TEXT NOT NULL DEFAULT 'member',
            PRIMARY KEY (org_id, email)
        );
        CREATE TABLE IF NOT EXISTS sessions (
            token       TEXT PRIMARY KEY,
            owner_email TEXT NOT NULL,
            ip          TEXT,
            created_at  TEXT NOT NULL,
            ttl_seconds INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_owner ON sessions(owner_email, created_at);",
    )?;
    Ok(())
}

/// Directory store reading from the SQLite schema above.
#[derive(Clone)]
pub struct SqliteDirectory {
    pool: DbPool,
}

impl SqliteDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|e| OrgSentryError::Pool(e.to_string()))
    }
}

#[async_trait::async_trait]
impl DirectoryStore for SqliteDirectory {
    async fn organization(&self, org_id: &str) -> Result<Option<Organization>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT id, plan, restrict_same_domain FROM organizations WHERE id = ?1",
                rusqlite::params![org_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, plan, restrict_same_domain)) = row else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT domain, plan FROM org_domains WHERE org_id = ?1 ORDER BY domain")?;
        let rows = stmt.query_map(rusqlite::params![org_id], |row| {
            Ok(OrgDomain {
                domain: row.get(0)?,
                plan: row.get::<_, Option<String>>(1)?.map(|p| Plan::parse(&p)),
            })
        })?;
        let mut domains = Vec::new();
        for row in rows {
            domains.push(row?);
        }

        let member_count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM members WHERE org_id = ?1",
            rusqlite::params![org_id],
            |row| row.get(0),
        )?;

        Ok(Some(Organization {
            id,
            plan: Plan::parse(&plan),
            restrict_same_domain,
            domains,
            member_count,
        }))
    }

    async fn session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT token, owner_email, ip, created_at, ttl_seconds
                 FROM sessions WHERE token = ?1",
                rusqlite::params![token],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((token, owner_email, ip, created_at, ttl_seconds)) = session else {
            return Ok(None);
        };

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| OrgSentryError::Store(format!("bad session timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(Session {
            token,
            owner_email,
            ip,
            created_at,
            ttl_seconds,
        }))
    }

    async fn recent_session_ip_count(&self, email: &str, since: DateTime<Utc>) -> Result<u32> {
        let conn = self.conn()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(DISTINCT ip) FROM sessions
             WHERE owner_email = ?1 AND ip IS NOT NULL AND created_at >= ?2",
            rusqlite::params![email, since.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Insert an organization row (provisioning/test helper).
pub fn insert_organization(
    conn: &Connection,
    id: &str,
    plan: Plan,
    restrict_same_domain: bool,
) -> Result<()> {
    conn.execute(
        "INSERT INTO organizations (id, plan, restrict_same_domain) VALUES (?1, ?2, ?3)",
        rusqlite::params![id, plan.as_str(), restrict_same_domain],
    )?;
    Ok(())
}

/// Insert a registered domain row (provisioning/test helper).
pub fn insert_org_domain(
    conn: &Connection,
    org_id: &str,
    domain: &str,
    plan: Option<Plan>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO org_domains (org_id, domain, plan) VALUES (?1, ?2, ?3)",
        rusqlite::params![org_id, domain, plan.map(|p| p.as_str())],
    )?;
    Ok(())
}

/// Insert a member row (provisioning/test helper).
pub fn insert_member(conn: &Connection, org_id: &str, email: &str, role: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO members (org_id, email, role) VALUES (?1, ?2, ?3)",
        rusqlite::params![org_id, email, role],
    )?;
    Ok(())
}

/// Insert a session row (provisioning/test helper).
pub fn insert_session(conn: &Connection, session: &Session) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, owner_email, ip, created_at, ttl_seconds)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            session.token,
            session.owner_email,
            session.ip,
            session.created_at.to_rfc3339(),
            session.ttl_seconds,
        ],
    )?;
    Ok(())
}

//! JSON and CSV export of the audit log, for admin review tooling.

use anyhow::Result;
use rusqlite::Connection;

use super::sqlite::query_recent;

/// Export all audit entries as a pretty-printed JSON string.
pub fn export_json(conn: &Connection) -> Result<String> {
    let entries = query_recent(conn, usize::MAX)?;
    let json = serde_json::to_string_pretty(&entries)?;
    Ok(json)
}

/// Export all audit entries as a CSV string.
pub fn export_csv(conn: &Connection) -> Result<String> {
    let entries = query_recent(conn, usize::MAX)?;
    let mut out = String::from(
        "id,timestamp,verdict,reason,risk_level,action_taken,email,domain,role,org_id,action,ip\n",
    );
    for e in &entries {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}\n",
            e.id.unwrap_or(0),
            csv_field(&e.timestamp),
            csv_field(&e.verdict),
            csv_field(&e.reason),
            csv_field(&e.risk_level),
            csv_field(&e.action_taken),
            csv_field(&e.email),
            csv_field(&e.domain),
            csv_field(&e.role),
            csv_field(e.org_id.as_deref().unwrap_or("")),
            csv_field(e.action.as_deref().unwrap_or("")),
            csv_field(e.ip.as_deref().unwrap_or("")),
        ));
    }
    Ok(out)
}

/// Quote a CSV field if it contains a comma, quote, or newline.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::sqlite::{append_entry, init_db};
    use crate::store::sqlite::open_memory_pool;

    fn seeded_conn() -> r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager> {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
        append_entry(
            &conn,
            &crate::audit::AuditEntry {
                id: None,
                timestamp: "2026-02-12T10:00:00+00:00".to_string(),
                verdict: "block".to_string(),
                reason: "DOMAIN_MISMATCH".to_string(),
                detail: "domain evil.com not registered".to_string(),
                risk_level: "medium".to_string(),
                action_taken: "blocked".to_string(),
                email: "mallory@evil.com".to_string(),
                domain: "evil.com".to_string(),
                role: "member".to_string(),
                org_id: Some("org-1".to_string()),
                action: None,
                ip: Some("10.0.0.1".to_string()),
                payload: None,
            },
        )
        .unwrap();
        conn
    }

    #[test]
    fn json_export_contains_entry() {
        let conn = seeded_conn();
        let json = export_json(&conn).unwrap();
        assert!(json.contains("DOMAIN_MISMATCH"));
        assert!(json.contains("mallory@evil.com"));
    }

    #[test]
    fn csv_export_has_header_and_row() {
        let conn = seeded_conn();
        let csv = export_csv(&conn).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,timestamp,verdict"));
        let row = lines.next().unwrap();
        assert!(row.contains("DOMAIN_MISMATCH"));
        assert!(row.contains("org-1"));
    }

    #[test]
    fn csv_field_quotes_commas() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}

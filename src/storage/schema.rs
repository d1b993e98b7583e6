//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 1,
            categories_json TEXT NOT NULL DEFAULT '[]',
            sentiment_label TEXT,
            sentiment_score REAL,
            lat REAL,
            lng REAL,
            processed INTEGER NOT NULL DEFAULT 0,
            incident_id TEXT
        );

        CREATE TABLE IF NOT EXISTS incidents (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            summary TEXT NOT NULL,
            description TEXT NOT NULL,
            severity INTEGER NOT NULL,
            severity_label TEXT NOT NULL,
            categories_json TEXT NOT NULL DEFAULT '[]',
            lat REAL,
            lng REAL,
            status TEXT NOT NULL DEFAULT 'new',
            assigned_to TEXT,
            resolution TEXT,
            report_ids_json TEXT NOT NULL DEFAULT '[]',
            report_count INTEGER NOT NULL,
            source_type TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS alerts (
            id TEXT PRIMARY KEY,
            incident_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            severity INTEGER NOT NULL,
            summary TEXT NOT NULL,
            lat REAL,
            lng REAL,
            contacts_json TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'created',
            acknowledged_at TEXT,
            acknowledged_by TEXT,
            resolved_at TEXT,
            resolution_notes TEXT,
            FOREIGN KEY (incident_id) REFERENCES incidents(id)
        );

        CREATE INDEX IF NOT EXISTS idx_reports_created ON reports(created_at);
        CREATE INDEX IF NOT EXISTS idx_reports_processed ON reports(processed);
        CREATE INDEX IF NOT EXISTS idx_incidents_created ON incidents(created_at);
        CREATE INDEX IF NOT EXISTS idx_alerts_created ON alerts(created_at);
        CREATE INDEX IF NOT EXISTS idx_alerts_incident ON alerts(incident_id);",
    )?;

    // Migration: Add 'acknowledged_by' to alerts if missing (pre-lifecycle schema)
    let has_ack_by: i32 = conn
        .query_row(
            "SELECT count(*) FROM pragma_table_info('alerts') WHERE name='acknowledged_by'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if has_ack_by == 0 {
        conn.execute("ALTER TABLE alerts ADD COLUMN acknowledged_by TEXT", [])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        // Verify tables exist by querying them
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap(); // Should not error
    }
}
